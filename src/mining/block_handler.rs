//! Block assembly driver
//!
//! Builds candidate blocks from the pending pool on top of a chosen node and
//! submits them to the chain. There is no proof of work: a block is just
//! its parent, its coinbase and the transactions the chain's selector
//! accepts.

use crate::core::{Block, BlockChain, Transaction, TxSelector};
use crate::core::transaction::Amount;
use log::{debug, info};

/// Assembles blocks paying rewards to one address
#[derive(Debug, Clone)]
pub struct BlockHandler {
    /// Address receiving coinbase rewards
    pub address: String,
    /// Reward minted by each created block
    pub coinbase_value: Amount,
}

impl BlockHandler {
    pub fn new(address: &str, coinbase_value: Amount) -> Self {
        Self {
            address: address.to_string(),
            coinbase_value,
        }
    }

    /// Submit a block received from elsewhere
    pub fn process_block<S: TxSelector>(&self, chain: &mut BlockChain<S>, block: Block) -> bool {
        chain.add_block(block)
    }

    /// Submit a transaction to the pending pool
    pub fn process_tx<S: TxSelector>(&self, chain: &mut BlockChain<S>, tx: Transaction) {
        chain.add_transaction(tx);
    }

    /// Create a block on top of the head and add it; returns it if accepted
    pub fn create_block<S: TxSelector>(&self, chain: &mut BlockChain<S>) -> Option<Block> {
        let head = chain.max_height_block().hash.clone();
        self.create_block_on(chain, &head)
    }

    /// Create a block on top of `parent_hash` and add it; returns it if accepted.
    ///
    /// Used to grow side branches as well as the head.
    pub fn create_block_on<S: TxSelector>(
        &self,
        chain: &mut BlockChain<S>,
        parent_hash: &str,
    ) -> Option<Block> {
        let parent = chain.get_node(parent_hash)?;
        let height = parent.height + 1;

        let mut utxo_pool = parent.utxo_pool.clone();
        let candidates = chain.transaction_pool().transactions();
        let transactions = chain.selector().select(&mut utxo_pool, &candidates);
        debug!(
            "Selected {} of {} pending transactions for height {}",
            transactions.len(),
            candidates.len(),
            height
        );

        let coinbase = Transaction::coinbase(&self.address, self.coinbase_value, height);
        let block = Block::new(parent_hash, coinbase, transactions);

        if chain.add_block(block.clone()) {
            info!(
                "Created block {} at height {} with {} transactions",
                block.hash,
                height,
                block.tx_count()
            );
            Some(block)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TransactionBuilder, UTXO};
    use crate::crypto::KeyPair;

    #[test]
    fn test_create_block_includes_pending() {
        let founder = KeyPair::generate();
        let miner = KeyPair::generate();
        let genesis = Block::genesis(&founder.address(), 25);
        let mut chain = BlockChain::new(genesis.clone());
        let handler = BlockHandler::new(&miner.address(), 25);

        let spend = TransactionBuilder::new()
            .add_input(&UTXO::new(&genesis.coinbase.hash, 0))
            .add_output(&miner.address(), 24)
            .build_and_sign(&founder)
            .unwrap();
        handler.process_tx(&mut chain, spend.clone());

        let block = handler.create_block(&mut chain).unwrap();
        assert_eq!(block.transactions, vec![spend]);
        assert_eq!(chain.height(), 2);
        assert!(chain.transaction_pool().is_empty());
        assert_eq!(chain.max_height_utxo_pool().balance(&miner.address()), 49);
    }

    #[test]
    fn test_invalid_pending_left_out() {
        let founder = KeyPair::generate();
        let miner = KeyPair::generate();
        let genesis = Block::genesis(&founder.address(), 25);
        let mut chain = BlockChain::new(genesis.clone());
        let handler = BlockHandler::new(&miner.address(), 25);

        let forged = TransactionBuilder::new()
            .add_input(&UTXO::new(&genesis.coinbase.hash, 0))
            .add_output(&miner.address(), 25)
            .build_and_sign(&miner)
            .unwrap();
        handler.process_tx(&mut chain, forged);

        let block = handler.create_block(&mut chain).unwrap();
        assert!(block.transactions.is_empty());
        assert_eq!(chain.transaction_pool().len(), 1);
    }

    #[test]
    fn test_create_block_on_unknown_parent() {
        let founder = KeyPair::generate();
        let mut chain = BlockChain::new(Block::genesis(&founder.address(), 25));
        let handler = BlockHandler::new(&founder.address(), 25);
        assert!(handler.create_block_on(&mut chain, &"00".repeat(32)).is_none());
    }

    #[test]
    fn test_process_block() {
        let founder = KeyPair::generate();
        let genesis = Block::genesis(&founder.address(), 25);
        let mut chain = BlockChain::new(genesis.clone());
        let handler = BlockHandler::new(&founder.address(), 25);

        let block = Block::new(
            &genesis.hash,
            Transaction::coinbase(&founder.address(), 25, 2),
            vec![],
        );
        assert!(handler.process_block(&mut chain, block.clone()));
        assert!(!handler.process_block(&mut chain, block));
    }
}
