//! UTXO Ledger CLI Application
//!
//! Drives the ledger engine through a simulated workload: random transfers
//! between a handful of key pairs, blocks assembled on the head, and
//! periodic competing blocks that fork the tree.

use clap::{Parser, Subcommand};
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::path::PathBuf;
use utxo_ledger::core::{Block, BlockChain, TransactionBuilder, UTXO};
use utxo_ledger::crypto::KeyPair;
use utxo_ledger::mining::BlockHandler;
use utxo_ledger::{LedgerConfig, SelectionMode};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(version = "0.1.0")]
#[command(about = "A UTXO ledger engine with max-fee selection and a pruned fork tree", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated workload against a fresh chain
    Simulate {
        /// Number of blocks to create on the head
        #[arg(short, long, default_value = "20")]
        blocks: u32,

        /// Transfers submitted before each block
        #[arg(short, long, default_value = "4")]
        transfers: u32,

        /// Create a competing block every N blocks (0 disables forks)
        #[arg(short, long, default_value = "3")]
        fork_every: u32,

        /// Number of participants
        #[arg(short, long, default_value = "4")]
        users: usize,

        /// Override the configured selection strategy
        #[arg(long, value_enum)]
        selection: Option<SelectionArg>,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Write it to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SelectionArg {
    Greedy,
    MaxFee,
}

impl From<SelectionArg> for SelectionMode {
    fn from(arg: SelectionArg) -> Self {
        match arg {
            SelectionArg::Greedy => SelectionMode::Greedy,
            SelectionArg::MaxFee => SelectionMode::MaxFee,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };

    match cli.command {
        Commands::Simulate {
            blocks,
            transfers,
            fork_every,
            users,
            selection,
        } => {
            let mut config = config;
            if let Some(selection) = selection {
                config.selection = selection.into();
            }
            simulate(&config, blocks, transfers, fork_every, users.max(2))?;
        }
        Commands::Config { output } => match output {
            Some(path) => {
                config.save(&path)?;
                println!("Configuration written to {:?}", path);
            }
            None => println!("{}", serde_json::to_string_pretty(&config)?),
        },
    }

    Ok(())
}

fn simulate(
    config: &LedgerConfig,
    blocks: u32,
    transfers: u32,
    fork_every: u32,
    user_count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::thread_rng();
    let users: Vec<KeyPair> = (0..user_count).map(|_| KeyPair::generate()).collect();

    let genesis = Block::genesis(&users[0].address(), config.coinbase_value);
    let mut chain = BlockChain::with_config(genesis, config);
    info!(
        "Simulating {} blocks with {:?} selection and cut-off age {}",
        blocks, config.selection, config.cut_off_age
    );

    let mut forks = 0;
    for round in 1..=blocks {
        for _ in 0..transfers {
            let sender = users.choose(&mut rng).ok_or("no participants")?;
            let recipient = users.choose(&mut rng).ok_or("no participants")?;

            // skip outputs an earlier pending transfer already spends
            let claimed: HashSet<UTXO> = chain
                .transaction_pool()
                .transactions()
                .iter()
                .flat_map(|tx| tx.inputs.iter().map(|input| input.utxo()))
                .collect();
            let Some((coin, output)) = chain
                .max_height_utxo_pool()
                .utxos_for_address(&sender.address())
                .into_iter()
                .find(|(utxo, output)| !claimed.contains(utxo) && output.value > 0)
            else {
                continue;
            };

            let fee = rng.gen_range(0..=output.value.min(2));
            let amount = rng.gen_range(0..=output.value - fee);
            let tx = TransactionBuilder::new()
                .add_input(&coin)
                .add_output(&recipient.address(), amount)
                .add_output(&sender.address(), output.value - fee - amount)
                .build_and_sign(sender)?;
            chain.add_transaction(tx);
        }

        let miner = &users[round as usize % users.len()];
        let handler = BlockHandler::new(&miner.address(), config.coinbase_value);
        let parent = chain.max_height_block().hash.clone();

        if handler.create_block(&mut chain).is_none() {
            println!("Round {}: block rejected", round);
            continue;
        }

        // a sibling of the block just created; the first one stays head
        if fork_every > 0 && round % fork_every == 0 {
            let rival = &users[(round as usize + 1) % users.len()];
            let rival_handler = BlockHandler::new(&rival.address(), config.coinbase_value);
            if rival_handler.create_block_on(&mut chain, &parent).is_some() {
                forks += 1;
            }
        }
    }

    let stats = chain.stats();
    println!("Chain");
    println!("  Height:               {}", stats.height);
    println!("  Head:                 {}", stats.head_hash);
    println!("  Retained nodes:       {}", stats.retained_nodes);
    println!("  Tips:                 {}", stats.tips);
    println!("  Forks created:        {}", forks);
    println!("  Pending transactions: {}", stats.pending_transactions);
    println!("  Head UTXOs:           {}", stats.head_utxos);
    println!("  Head total value:     {}", stats.head_total_value);
    println!("Balances at head");
    let pool = chain.max_height_utxo_pool();
    for (i, user) in users.iter().enumerate() {
        println!("  user {} ({}...): {}", i, &user.address()[..16], pool.balance(&user.address()));
    }

    Ok(())
}
