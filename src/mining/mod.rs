//! Block assembly on top of the chain tree

pub mod block_handler;

pub use block_handler::BlockHandler;
