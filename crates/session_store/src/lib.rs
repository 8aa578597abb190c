//! In-memory conversation history keyed by thread id.

mod store;

pub use store::{HistoryPolicy, HistoryStore};
