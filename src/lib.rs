// Taskboard - task board storage with local SQLite and shared remote document backends

pub mod board;
pub mod collection;
pub mod config;
pub mod filter;
pub mod groups;
pub mod models;
pub mod record;
pub mod storage;
pub mod store;
pub mod tasks;

// Re-export main types for convenience
pub use board::{Board, BoardExport, DocumentFormat, ImportSummary};
pub use collection::Collection;
pub use config::{Config, RemoteConfig, StorageKind};
pub use filter::{Filter, FilterOp, IndexValue};
pub use groups::GroupService;
pub use models::{Group, Priority, Task, TaskStatus};
pub use record::{Record, now_ms};
pub use storage::{Adapter, StorageAdapter, StorageFactory};
pub use store::LocalStore;
pub use tasks::{TaskService, TaskUpdate};
