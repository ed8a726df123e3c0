//! Pipelining page cache for server-side paged JSON tables.

pub mod cache;
pub mod config;
pub mod http;
pub mod memory;
pub mod policy;
pub mod registry;
pub mod transport;
pub mod types;
pub mod window;

pub use cache::{CacheStats, PagedResultCache};
pub use config::PipeConfig;
pub use http::HttpTransport;
pub use memory::{MemoryTable, MemoryTransport};
pub use policy::{decide, pipe_factor, Decision, FetchPlan};
pub use registry::TableRegistry;
pub use transport::{FetchQuery, Transport};
pub use types::*;
pub use window::{CacheWindow, WindowSnapshot, WindowState};
