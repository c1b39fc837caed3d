//! Data model for audit blocks and the canonical block digest.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// One audit event sealed into the chain. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    /// Position in the chain; 0 for genesis.
    pub index: u64,
    /// RFC3339 creation time. Informational only.
    pub timestamp: String,
    pub file_hash: String,
    pub event: String,
    pub event_time: String,
    pub location: String,
    pub server: String,
    /// SHA-256 hex of this block's canonical record.
    pub hash: String,
    /// SHA-256 hex of the previous block (empty for genesis).
    pub prev_hash: String,
}

/// Caller-supplied fields of a block. Everything is opaque to the ledger
/// except `event`, which must be non-empty.
///
/// Field names are matched without regard to case (`FileHash`, `fileHash`,
/// `filehash`, `FILEHASH`); missing or null fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockEntry {
    pub file_hash: String,
    pub event: String,
    pub event_time: String,
    pub location: String,
    pub server: String,
}

impl<'de> Deserialize<'de> for BlockEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = FoldedObject::from_deserializer(deserializer)?;
        Self::from_folded(&mut fields).map_err(de::Error::custom)
    }
}

impl BlockEntry {
    fn from_folded(fields: &mut FoldedObject) -> Result<Self, serde_json::Error> {
        Ok(BlockEntry {
            file_hash: fields.take("filehash")?,
            event: fields.take("event")?,
            event_time: fields.take("eventtime")?,
            location: fields.take("location")?,
            server: fields.take("server")?,
        })
    }
}

/// A JSON object whose keys have been folded to lowercase with underscores
/// dropped, so request fields match in any casing. Unknown keys are ignored.
pub(crate) struct FoldedObject(Map<String, Value>);

impl FoldedObject {
    pub(crate) fn from_deserializer<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .map(|(key, value)| (fold_key(&key), value))
                .collect(),
        ))
    }

    /// Remove and decode the field stored under the folded name `key`.
    /// Missing and null fields decode to the default.
    pub(crate) fn take<T: DeserializeOwned + Default>(
        &mut self,
        key: &str,
    ) -> Result<T, serde_json::Error> {
        match self.0.remove(key) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value),
        }
    }
}

fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl Block {
    /// Build a block at `index` on top of `prev_hash` and compute its digest.
    pub fn seal(index: u64, timestamp: String, entry: BlockEntry, prev_hash: String) -> Self {
        let mut block = Block {
            index,
            timestamp,
            file_hash: entry.file_hash,
            event: entry.event,
            event_time: entry.event_time,
            location: entry.location,
            server: entry.server,
            hash: String::new(),
            prev_hash,
        };
        block.hash = compute_block_hash(&block);
        block
    }

    /// The first block of every chain: index 0, no predecessor, empty payload.
    pub fn genesis(timestamp: String) -> Self {
        Self::seal(0, timestamp, BlockEntry::default(), String::new())
    }
}

/// Hash inputs (concatenate as bytes, SHA-256) and return lowercase hex.
pub fn hash_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hex::encode(hasher.finalize())
}

/// Compute a block hash from its fields.
///
/// The record is the plain concatenation, without separators, of: index in
/// decimal, timestamp, file hash, event, event time, location, server and
/// previous hash. Anyone re-deriving a digest from their own copy of the
/// fields must follow the same order.
pub fn compute_block_hash(b: &Block) -> String {
    hash_concat(&[
        b.index.to_string().as_bytes(),
        b.timestamp.as_bytes(),
        b.file_hash.as_bytes(),
        b.event.as_bytes(),
        b.event_time.as_bytes(),
        b.location.as_bytes(),
        b.server.as_bytes(),
        b.prev_hash.as_bytes(),
    ])
}

/// Current UTC time as an RFC3339 string.
pub fn now_rfc3339() -> Result<String, time::error::Format> {
    OffsetDateTime::now_utc().format(&Rfc3339)
}
