//! In-memory [`Session`](crate::session::Session) implementation.
//!
//! A small document store with buffered transactions, savepoints, a bounded
//! connection pool and one-shot fault injection. Useful as a test fixture
//! for code built on the engine, and as a reference for writing a session
//! adapter over a real driver.
//!
//! ```text
//!  MemoryDatabase ── committed tables (RwLock)
//!        │        └─ ConnectionPool ── Connection ── Option<OpenTransaction>
//!        ▼
//!  MemorySession: Pool | Pinned(conn) | Transaction(conn, id)
//! ```

mod config;
mod database;
mod error;
mod pool;
mod session;
mod transaction;

pub use config::MemoryConfig;
pub use database::{MemoryDatabase, MemoryStats};
pub use error::{FailPoint, MemoryError, MemoryResult};
pub use session::MemorySession;
pub use transaction::TransactionInfo;
