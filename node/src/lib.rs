pub mod block_processor;
pub mod config;
pub mod confirming_set;
pub mod error;
pub mod logging;
pub mod network;
pub mod node;
pub mod observers;
pub mod unchecked;
pub mod vote_processor;

pub use block_processor::{BlockProcessor, BlockSource, QueuedBlock};
pub use config::NodeConfig;
pub use confirming_set::ConfirmingSet;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use network::{LoopbackNetwork, NetworkSink};
pub use node::Node;
pub use observers::Observers;
pub use unchecked::Unchecked;
pub use vote_processor::VoteProcessor;
