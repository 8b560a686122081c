pub mod btree;
pub mod command;
pub mod config;
pub mod graph;
pub mod shell;

pub use btree::{
    BPlusNode, BPlusTree, BPlusTreeError, BPlusTreeIter, BPlusTreeResult, DEFAULT_ORDER,
    IdAllocator, KeyOrdering, NodeId,
};
pub use command::Command;
pub use config::{ConfigError, ConfigResult, ShellConfig};
pub use graph::{DirectedGraph, Relation};
pub use shell::{Output, Session, ShellError, ShellResult};
