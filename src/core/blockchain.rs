//! Block chain tree
//!
//! Keeps every recent block as a node of a tree rooted at genesis. Each node
//! owns the UTXO pool obtained by applying every block from genesis to that
//! node, so competing branches never observe each other's spends. The head
//! is the highest node; the first node to reach a height keeps the head on
//! ties.
//!
//! Memory is bounded by the cut-off age `K`: a block may only extend a node
//! at most `K` blocks below the head, and nodes that can no longer be
//! extended are pruned.

use crate::config::LedgerConfig;
use crate::core::block::{Block, BlockError, GENESIS_HEIGHT};
use crate::core::selector::{Selector, TxSelector};
use crate::core::transaction::{TotalAmount, Transaction};
use crate::core::tx_pool::TransactionPool;
use crate::core::utxo::UtxoPool;
use log::{debug, info, warn};
use std::collections::HashMap;

/// Default cut-off age
pub const CUT_OFF_AGE: u64 = 10;

/// A block together with its height and the pool valid after it
#[derive(Debug, Clone)]
pub struct BranchNode {
    pub height: u64,
    pub block: Block,
    pub utxo_pool: UtxoPool,
}

impl BranchNode {
    pub fn parent_hash(&self) -> Option<&str> {
        self.block.prev_block_hash.as_deref()
    }
}

/// The chain tree
#[derive(Debug)]
pub struct BlockChain<S = Selector> {
    nodes: HashMap<String, BranchNode>,
    head: String,
    cut_off_age: u64,
    tx_pool: TransactionPool,
    selector: S,
}

impl BlockChain<Selector> {
    /// Create a chain holding only `genesis`, validated greedily with the default cut-off age
    pub fn new(genesis: Block) -> Self {
        Self::with_selector(genesis, Selector::default(), CUT_OFF_AGE)
    }

    pub fn with_config(genesis: Block, config: &LedgerConfig) -> Self {
        Self::with_selector(genesis, Selector::from_mode(config.selection), config.cut_off_age)
    }
}

impl<S: TxSelector> BlockChain<S> {
    /// Create a chain holding only `genesis`.
    ///
    /// Genesis is trusted: its pool contains exactly its coinbase output.
    pub fn with_selector(genesis: Block, selector: S, cut_off_age: u64) -> Self {
        let mut utxo_pool = UtxoPool::new();
        utxo_pool.apply(&genesis.coinbase);

        let head = genesis.hash.clone();
        let mut nodes = HashMap::new();
        nodes.insert(
            head.clone(),
            BranchNode {
                height: GENESIS_HEIGHT,
                block: genesis,
                utxo_pool,
            },
        );

        Self {
            nodes,
            head,
            cut_off_age,
            tx_pool: TransactionPool::new(),
            selector,
        }
    }

    /// Add `block` if it is valid; returns whether it was added
    pub fn add_block(&mut self, block: Block) -> bool {
        let hash = block.hash.clone();
        match self.try_add_block(block) {
            Ok(_) => true,
            Err(e) => {
                warn!("Rejected block {}: {}", hash, e);
                false
            }
        }
    }

    /// Add `block` if it is valid, returning the height it was added at.
    ///
    /// Nothing changes when an error is returned.
    pub fn try_add_block(&mut self, block: Block) -> Result<u64, BlockError> {
        let prev = block.validate_structure()?;
        if self.nodes.contains_key(&block.hash) {
            return Err(BlockError::DuplicateBlock(block.hash.clone()));
        }
        let parent = self
            .nodes
            .get(prev)
            .ok_or_else(|| BlockError::UnknownParent(prev.to_string()))?;

        let head_height = self.height();
        if parent.height.saturating_add(self.cut_off_age) < head_height {
            return Err(BlockError::ParentTooOld {
                parent_height: parent.height,
                head_height,
            });
        }
        // a replayed coinbase would re-create an output that may already be spent
        let height = parent.height + 1;
        if block.coinbase.coinbase_height != Some(height) {
            return Err(BlockError::CoinbaseHeight {
                expected: height,
                found: block.coinbase.coinbase_height,
            });
        }

        let mut utxo_pool = parent.utxo_pool.clone();
        let accepted = self.selector.select(&mut utxo_pool, &block.transactions);
        if accepted.len() != block.transactions.len() {
            return Err(BlockError::InvalidTransactions {
                accepted: accepted.len(),
                listed: block.transactions.len(),
            });
        }

        for tx in &accepted {
            self.tx_pool.remove(&tx.hash);
        }
        utxo_pool.apply(&block.coinbase);

        let hash = block.hash.clone();
        info!(
            "Added block {} at height {} with {} transactions",
            hash,
            height,
            accepted.len()
        );
        self.nodes.insert(
            hash.clone(),
            BranchNode {
                height,
                block,
                utxo_pool,
            },
        );

        if height > head_height {
            debug!("New head {} at height {}", hash, height);
            self.head = hash;
            self.prune();
        }
        Ok(height)
    }

    /// Add a transaction to the pending pool.
    ///
    /// The pool is keyed by hash, so a transaction whose hash does not match
    /// its content is dropped instead of displacing another entry.
    pub fn add_transaction(&mut self, tx: Transaction) {
        if tx.hash != tx.calculate_hash() {
            warn!("Dropped transaction {}: hash does not match content", tx.hash);
            return;
        }
        self.tx_pool.add(tx);
    }

    // Nodes this far behind can no longer be extended
    fn prune(&mut self) {
        let head_height = self.height();
        let keep_from = head_height.saturating_sub(self.cut_off_age.saturating_add(1));
        let before = self.nodes.len();
        self.nodes.retain(|_, node| node.height >= keep_from);
        let pruned = before - self.nodes.len();
        if pruned > 0 {
            debug!("Pruned {} nodes below height {}", pruned, keep_from);
        }
    }

    fn head_node(&self) -> &BranchNode {
        self.nodes
            .get(&self.head)
            .expect("head node is never pruned")
    }

    /// Get the maximum height block
    pub fn max_height_block(&self) -> &Block {
        &self.head_node().block
    }

    /// Get the UTXO pool for mining a new block on top of the max height block
    pub fn max_height_utxo_pool(&self) -> &UtxoPool {
        &self.head_node().utxo_pool
    }

    /// Get the pending transactions for mining a new block
    pub fn transaction_pool(&self) -> &TransactionPool {
        &self.tx_pool
    }

    pub fn height(&self) -> u64 {
        self.head_node().height
    }

    pub fn cut_off_age(&self) -> u64 {
        self.cut_off_age
    }

    pub fn selector(&self) -> &S {
        &self.selector
    }

    pub fn get_node(&self, hash: &str) -> Option<&BranchNode> {
        self.nodes.get(hash)
    }

    pub fn contains_block(&self, hash: &str) -> bool {
        self.nodes.contains_key(hash)
    }

    /// Number of nodes currently retained
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes without retained children
    pub fn tips(&self) -> Vec<&BranchNode> {
        let mut tips: Vec<&BranchNode> = self
            .nodes
            .values()
            .filter(|node| {
                !self
                    .nodes
                    .values()
                    .any(|other| other.parent_hash() == Some(node.block.hash.as_str()))
            })
            .collect();
        tips.sort_by(|a, b| b.height.cmp(&a.height).then(a.block.hash.cmp(&b.block.hash)));
        tips
    }

    /// Get chain statistics
    pub fn stats(&self) -> ChainStats {
        let head = self.head_node();
        ChainStats {
            height: head.height,
            retained_nodes: self.nodes.len(),
            tips: self.tips().len(),
            pending_transactions: self.tx_pool.len(),
            head_utxos: head.utxo_pool.len(),
            head_total_value: head.utxo_pool.total_value(),
            head_hash: head.block.hash.clone(),
        }
    }
}

/// Chain statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ChainStats {
    pub height: u64,
    pub retained_nodes: usize,
    pub tips: usize,
    pub pending_transactions: usize,
    pub head_utxos: usize,
    pub head_total_value: TotalAmount,
    pub head_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::selector::SelectionMode;
    use crate::core::transaction::{Amount, TransactionBuilder};
    use crate::core::utxo::UTXO;
    use crate::crypto::KeyPair;

    const REWARD: Amount = 25;

    fn coinbase_block(parent: &Block, miner: &KeyPair, height: u64, txs: Vec<Transaction>) -> Block {
        Block::new(
            &parent.hash,
            Transaction::coinbase(&miner.address(), REWARD, height),
            txs,
        )
    }

    fn new_chain(founder: &KeyPair) -> BlockChain {
        BlockChain::new(Block::genesis(&founder.address(), REWARD))
    }

    #[test]
    fn test_genesis_state() {
        let founder = KeyPair::generate();
        let genesis = Block::genesis(&founder.address(), REWARD);
        let chain = BlockChain::new(genesis.clone());

        assert_eq!(chain.height(), GENESIS_HEIGHT);
        assert_eq!(chain.max_height_block(), &genesis);
        assert_eq!(chain.max_height_utxo_pool().len(), 1);
        assert_eq!(
            chain.max_height_utxo_pool().balance(&founder.address()),
            TotalAmount::from(REWARD)
        );
        assert!(chain.transaction_pool().is_empty());
    }

    #[test]
    fn test_add_block_with_transaction() {
        let founder = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut chain = new_chain(&founder);
        let genesis = chain.max_height_block().clone();

        let spend = TransactionBuilder::new()
            .add_input(&UTXO::new(&genesis.coinbase.hash, 0))
            .add_output(&bob.address(), 20)
            .build_and_sign(&founder)
            .unwrap();
        chain.add_transaction(spend.clone());
        assert_eq!(chain.transaction_pool().len(), 1);

        let block = coinbase_block(&genesis, &bob, 2, vec![spend]);
        assert_eq!(chain.try_add_block(block.clone()), Ok(2));

        assert_eq!(chain.max_height_block(), &block);
        assert!(chain.transaction_pool().is_empty());
        let pool = chain.max_height_utxo_pool();
        assert_eq!(pool.balance(&bob.address()), TotalAmount::from(20 + REWARD));
        assert_eq!(pool.balance(&founder.address()), 0);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let founder = KeyPair::generate();
        let mut chain = new_chain(&founder);
        let stranger = Block::genesis("someone else", REWARD);
        let block = coinbase_block(&stranger, &founder, 2, vec![]);

        assert_eq!(
            chain.try_add_block(block),
            Err(BlockError::UnknownParent(stranger.hash.clone()))
        );
        assert!(!chain.add_block(Block::genesis("another genesis", REWARD)));
        assert_eq!(chain.node_count(), 1);
    }

    #[test]
    fn test_duplicate_block_rejected() {
        let founder = KeyPair::generate();
        let mut chain = new_chain(&founder);
        let genesis = chain.max_height_block().clone();
        let block = coinbase_block(&genesis, &founder, 2, vec![]);

        assert!(chain.add_block(block.clone()));
        assert_eq!(
            chain.try_add_block(block.clone()),
            Err(BlockError::DuplicateBlock(block.hash.clone()))
        );
    }

    #[test]
    fn test_all_or_nothing() {
        let founder = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut chain = new_chain(&founder);
        let genesis = chain.max_height_block().clone();
        let coin = UTXO::new(&genesis.coinbase.hash, 0);

        let valid = TransactionBuilder::new()
            .add_input(&coin)
            .add_output(&bob.address(), 25)
            .build_and_sign(&founder)
            .unwrap();
        let double_spend = TransactionBuilder::new()
            .add_input(&coin)
            .add_output(&founder.address(), 25)
            .build_and_sign(&founder)
            .unwrap();

        let block = coinbase_block(&genesis, &bob, 2, vec![valid, double_spend]);
        let before = chain.max_height_utxo_pool().clone();

        for _ in 0..2 {
            assert_eq!(
                chain.try_add_block(block.clone()),
                Err(BlockError::InvalidTransactions {
                    accepted: 1,
                    listed: 2
                })
            );
            assert_eq!(chain.height(), GENESIS_HEIGHT);
            assert_eq!(chain.max_height_utxo_pool(), &before);
        }
    }

    #[test]
    fn test_fork_tie_keeps_first_head() {
        let founder = KeyPair::generate();
        let miner_a = KeyPair::generate();
        let miner_b = KeyPair::generate();
        let mut chain = new_chain(&founder);
        let genesis = chain.max_height_block().clone();

        let a = coinbase_block(&genesis, &miner_a, 2, vec![]);
        let b = coinbase_block(&genesis, &miner_b, 2, vec![]);
        assert!(chain.add_block(a.clone()));
        assert!(chain.add_block(b.clone()));
        assert_eq!(chain.max_height_block(), &a);
        assert_eq!(chain.tips().len(), 2);

        // extending the losing branch makes it the head
        let b2 = coinbase_block(&b, &miner_b, 3, vec![]);
        assert!(chain.add_block(b2.clone()));
        assert_eq!(chain.max_height_block(), &b2);
        assert_eq!(chain.max_height_utxo_pool().balance(&miner_a.address()), 0);
        assert_eq!(
            chain.max_height_utxo_pool().balance(&miner_b.address()),
            TotalAmount::from(2 * REWARD)
        );
    }

    #[test]
    fn test_cut_off_and_pruning() {
        let founder = KeyPair::generate();
        let miner = KeyPair::generate();
        let genesis = Block::genesis(&founder.address(), REWARD);
        let mut chain = BlockChain::with_selector(genesis.clone(), Selector::from_mode(SelectionMode::Greedy), 2);

        let mut tip = genesis.clone();
        for height in 2..=3 {
            tip = coinbase_block(&tip, &miner, height, vec![]);
            assert!(chain.add_block(tip.clone()));
        }
        // head 3, genesis at 1: lag 2 == K, still extendable
        let side = coinbase_block(&genesis, &founder, 2, vec![]);
        assert!(chain.add_block(side));

        tip = coinbase_block(&tip, &miner, 4, vec![]);
        assert!(chain.add_block(tip.clone()));
        let late = coinbase_block(&genesis, &miner, 2, vec![]);
        assert_eq!(
            chain.try_add_block(late),
            Err(BlockError::ParentTooOld {
                parent_height: 1,
                head_height: 4
            })
        );
        // genesis is kept one level past the window
        assert!(chain.contains_block(&genesis.hash));

        tip = coinbase_block(&tip, &miner, 5, vec![]);
        assert!(chain.add_block(tip));
        assert!(!chain.contains_block(&genesis.hash));
        // heights 2 (both branches) through 5 remain
        assert_eq!(chain.stats().retained_nodes, 5);
    }

    #[test]
    fn test_relabelled_transaction_cannot_take_over_output() {
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();
        let mut chain = new_chain(&alice);
        let genesis = chain.max_height_block().clone();
        let alice_coin = UTXO::new(&genesis.coinbase.hash, 0);

        let second = coinbase_block(&genesis, &mallory, 2, vec![]);
        assert!(chain.add_block(second.clone()));

        let mut forged = TransactionBuilder::new()
            .add_input(&UTXO::new(&second.coinbase.hash, 0))
            .add_output(&mallory.address(), REWARD)
            .build_and_sign(&mallory)
            .unwrap();
        forged.hash = genesis.coinbase.hash.clone();

        let third = coinbase_block(&second, &mallory, 3, vec![forged]);
        assert_eq!(
            chain.try_add_block(third),
            Err(BlockError::InvalidTransactions {
                accepted: 0,
                listed: 1
            })
        );
        let pool = chain.max_height_utxo_pool();
        assert!(pool.get(&alice_coin).unwrap().is_owned_by(&alice.address()));
    }

    #[test]
    fn test_relabelled_transaction_not_pending() {
        let alice = KeyPair::generate();
        let mut chain = new_chain(&alice);
        let genesis = chain.max_height_block().clone();

        let honest = TransactionBuilder::new()
            .add_input(&UTXO::new(&genesis.coinbase.hash, 0))
            .add_output(&alice.address(), REWARD)
            .build_and_sign(&alice)
            .unwrap();
        let mut relabelled = TransactionBuilder::new()
            .add_input(&UTXO::new(&genesis.coinbase.hash, 0))
            .add_output(&alice.address(), 1)
            .build_and_sign(&alice)
            .unwrap();
        relabelled.hash = honest.hash.clone();

        chain.add_transaction(honest.clone());
        chain.add_transaction(relabelled);
        assert_eq!(chain.transaction_pool().transactions(), vec![honest]);
    }

    #[test]
    fn test_replayed_coinbase_rejected() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut chain = new_chain(&alice);
        let genesis = chain.max_height_block().clone();
        let coin = UTXO::new(&genesis.coinbase.hash, 0);

        let spend = TransactionBuilder::new()
            .add_input(&coin)
            .add_output(&bob.address(), REWARD)
            .build_and_sign(&alice)
            .unwrap();
        let second = coinbase_block(&genesis, &bob, 2, vec![spend]);
        assert!(chain.add_block(second.clone()));

        let replay = Block::new(&second.hash, genesis.coinbase.clone(), vec![]);
        assert_eq!(
            chain.try_add_block(replay),
            Err(BlockError::CoinbaseHeight {
                expected: 3,
                found: Some(GENESIS_HEIGHT)
            })
        );
        assert!(!chain.max_height_utxo_pool().contains(&coin));

        let ahead = coinbase_block(&second, &alice, 4, vec![]);
        assert_eq!(
            chain.try_add_block(ahead),
            Err(BlockError::CoinbaseHeight {
                expected: 3,
                found: Some(4)
            })
        );
        assert_eq!(chain.height(), 2);
    }

    #[test]
    fn test_unbounded_cut_off_age() {
        let founder = KeyPair::generate();
        let rival = KeyPair::generate();
        let genesis = Block::genesis(&founder.address(), REWARD);
        let mut chain = BlockChain::with_selector(
            genesis.clone(),
            Selector::from_mode(SelectionMode::Greedy),
            u64::MAX,
        );

        let mut tip = genesis.clone();
        for height in 2..=4 {
            tip = coinbase_block(&tip, &founder, height, vec![]);
            assert!(chain.add_block(tip.clone()));
        }
        assert!(chain.add_block(coinbase_block(&genesis, &rival, 2, vec![])));
        assert_eq!(chain.node_count(), 5);
    }
}
