pub mod config;
pub mod events;
pub mod file_store;
pub mod link_parser;
pub mod link_rewriter;
pub mod memory_store;
pub mod page_name;
pub mod page_store;
pub mod reference_graph;
pub mod rename;
pub mod repository;

pub use config::Config;
pub use reference_graph::ReferenceGraph;
pub use rename::{PageRenamer, RenameError, RenameResult};
pub use repository::PageRepository;
