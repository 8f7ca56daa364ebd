use serde_json::Value;

use crate::errors::Result;

/// Storage for JSON documents by key.
///
/// An absent key (`Ok(None)`) means nothing was ever saved under it, which is
/// distinct from a saved empty document.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>>;

    fn save(&self, key: &str, value: &Value) -> Result<()>;
}
