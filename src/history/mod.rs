// History module - completed sessions and their persistence
//
// 1. Session: immutable record of one run plus per-language analysis cache
// 2. SessionHistoryStore: bounded FIFO owner of all sessions
// 3. HistoryPersistence: durable slot the store writes through to

pub mod persistence;
pub mod session;
pub mod store;

pub use persistence::{HistoryPersistence, JsonFilePersistence, MemoryPersistence};
pub use session::Session;
pub use store::{AppendReceipt, CacheReceipt, HistorySort, SessionHistoryStore};
