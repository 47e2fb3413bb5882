//! The encrypted account store.
//!
//! This module provides:
//! - `AccountRecord` and its binary codec (`record`)
//! - The binary store file format with atomic persistence (`format`)
//! - The sidecar lock that serializes writers (`lock`)
//! - The `AccountStore` session with CRUD operations (`store`)

pub mod format;
pub mod lock;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use format::{StoreHeader, CURRENT_VERSION};
pub use lock::{LockMode, LockPolicy};
pub use record::{AccountIndex, AccountRecord};
pub use store::{AccountStore, MessageId, StoreOptions};
