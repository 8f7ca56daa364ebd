//! Key-value persistence for ledger state.
//!
//! The engine persists whole JSON documents under a handful of fixed keys.
//! [`StateStore`] is the seam; hosts plug in their own medium, and two
//! implementations ship here.

mod json_file_store;
mod memory_store;
mod state_store_traits;

pub use json_file_store::JsonFileStateStore;
pub use memory_store::InMemoryStateStore;
pub use state_store_traits::StateStore;
