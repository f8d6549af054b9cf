//! Typed property-value store.
//!
//! A [`PropertyMap`] holds named attributes on a game object as
//! `serde_json::Value`s and round-trips them through serde on access, so
//! callers read and write plain Rust types while storage stays uniform.
//! Well-known keys live in [`keys`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::WorldError;

/// Well-known property keys.
pub mod keys {
    /// Blast radius of an explosive, in blocks.
    pub const EXPLOSION_RADIUS: &str = "explosion_radius";
    /// Full fuse length of a fused explosive, in ticks.
    pub const FUSE_DURATION: &str = "fuse_duration";
    /// Ticks left on a currently-burning fuse.
    pub const FUSE_TICKS_REMAINING: &str = "fuse_ticks_remaining";
    /// Whether a fused explosive is currently primed.
    pub const PRIMED: &str = "primed";
}

// ---------------------------------------------------------------------------
// PropertyMap
// ---------------------------------------------------------------------------

/// Named, typed attributes on a game object.
///
/// Backed by a `BTreeMap` so that serialization order (and therefore the
/// world state digest) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyMap {
    values: BTreeMap<String, serde_json::Value>,
}

impl PropertyMap {
    /// Create an empty property map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the property stored under `key`, deserialized to `T`.
    ///
    /// Returns `Ok(None)` if the key is absent; fails if a value is present
    /// but does not deserialize to `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, WorldError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                WorldError::PropertyDeserialization {
                    key: key.to_owned(),
                    details: e.to_string(),
                }
            }),
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), WorldError> {
        let json = serde_json::to_value(value).map_err(|e| WorldError::PropertySerialization {
            key: key.to_owned(),
            details: e.to_string(),
        })?;
        self.values.insert(key.to_owned(), json);
        Ok(())
    }

    /// Remove the property stored under `key`, returning whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Whether a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The raw key-value view, in key order.
    pub fn raw(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.values
    }

    /// Number of stored properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no properties are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
