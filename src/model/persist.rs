//! JSON persistence for models and cluster sets.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write `value` to `path`, replacing any existing file.
pub fn save<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    std::fs::write(path, to_bytes(value)?)?;
    Ok(())
}

pub fn load<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T> {
    from_bytes(&std::fs::read(path)?)
}
