//! # IdentityStore: Persistent Identity Storage
//!
//! Saved identities live in sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree         | Key                 | Value                        |
//! |--------------|---------------------|------------------------------|
//! | `identities` | `sequence` (8B BE)  | `json(IdentityRecord)`       |
//! | `ids`        | `id` (UTF-8)        | `sequence` (8B BE)           |
//! | `dids`       | `did` (UTF-8)       | `id` (UTF-8)                 |
//!
//! Sequence numbers come from sled's monotonic id generator and are stored
//! big-endian, so iterating `identities` yields records in the order they
//! were saved. `dids` is a uniqueness index: one record per identifier.
//!
//! Records are stored as JSON rather than a binary format. It's the same
//! shape as the export envelope, which makes the on-disk data greppable.

use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use super::export::{build_record, envelope_entries, short_did, ExportEnvelope, ImportSummary};
use crate::crypto::keys::KeyPair;
use crate::encoding::constant_time_eq;
use crate::error::ErrorKind;
use crate::identity::{IdentifierCodec, IdentityRecord};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("an identity with DID {0} already exists")]
    DuplicateDid(String),

    #[error("an identity with id {0} already exists")]
    DuplicateId(String),

    #[error("corrupt index entry: {0}")]
    CorruptIndex(String),

    #[error("stored record is invalid: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidRecord(_) => ErrorKind::DecodeFormatError,
            _ => ErrorKind::Storage,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// IdentityStore
// ---------------------------------------------------------------------------

/// Persistent store of [`IdentityRecord`]s.
///
/// # Thread Safety
///
/// sled trees are thread-safe; `IdentityStore` is `Clone` and can be shared
/// via `Arc` without extra locking. `save` and `delete` touch all three
/// trees inside one sled transaction, so the indexes never point at a
/// missing record or miss an existing one.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    db: Db,
    identities: Tree,
    ids: Tree,
    dids: Tree,
}

impl IdentityStore {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that is deleted when dropped. For tests and dry runs.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let identities = db.open_tree("identities")?;
        let ids = db.open_tree("ids")?;
        let dids = db.open_tree("dids")?;
        Ok(Self {
            db,
            identities,
            ids,
            dids,
        })
    }

    // -- Writes ------------------------------------------------------------

    /// Persist a record. Returns its id.
    ///
    /// Fails with [`StoreError::DuplicateDid`] if a record with the same
    /// `did_key` is already stored, and with [`StoreError::DuplicateId`] if
    /// the `id` is taken. Either way nothing is written.
    pub fn save(&self, record: &IdentityRecord) -> StoreResult<String> {
        let bytes =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let sequence = self.db.generate_id()?.to_be_bytes();
        let id = record.id.as_bytes();
        let did = record.did_key.as_bytes();

        (&self.identities, &self.ids, &self.dids)
            .transaction(
                |(identities, ids, dids)| -> ConflictableTransactionResult<(), StoreError> {
                    if dids.get(did)?.is_some() {
                        return Err(ConflictableTransactionError::Abort(
                            StoreError::DuplicateDid(short_did(&record.did_key)),
                        ));
                    }
                    if ids.get(id)?.is_some() {
                        return Err(ConflictableTransactionError::Abort(
                            StoreError::DuplicateId(record.id.clone()),
                        ));
                    }
                    identities.insert(&sequence[..], bytes.as_slice())?;
                    ids.insert(id, &sequence[..])?;
                    dids.insert(did, id)?;
                    Ok(())
                },
            )
            .map_err(from_transaction_error)?;
        self.db.flush()?;

        tracing::debug!(
            id = %record.id,
            algorithm = %record.algorithm_type,
            generation = %record.generation_type,
            "identity saved"
        );
        Ok(record.id.clone())
    }

    /// Set or replace a record's display name. `Ok(false)` if no such id.
    pub fn rename(&self, id: &str, custom_name: &str) -> StoreResult<bool> {
        let Some(sequence) = self.ids.get(id.as_bytes())? else {
            return Ok(false);
        };
        let Some(mut record) = self.read(&sequence)? else {
            return Err(StoreError::CorruptIndex(format!("id {} has no record", id)));
        };
        record.custom_name = Some(custom_name.to_string());
        let bytes =
            serde_json::to_vec(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.identities.insert(sequence, bytes)?;
        self.db.flush()?;
        Ok(true)
    }

    /// Remove a record and both of its index entries. `Ok(false)` if no
    /// such id.
    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let removed = (&self.identities, &self.ids, &self.dids)
            .transaction(
                |(identities, ids, dids)| -> ConflictableTransactionResult<bool, StoreError> {
                    let Some(sequence) = ids.get(id.as_bytes())? else {
                        return Ok(false);
                    };
                    if let Some(bytes) = identities.get(&sequence)? {
                        let record =
                            decode_record(&bytes).map_err(ConflictableTransactionError::Abort)?;
                        dids.remove(record.did_key.as_bytes())?;
                        identities.remove(sequence.clone())?;
                    }
                    ids.remove(id.as_bytes())?;
                    Ok(true)
                },
            )
            .map_err(from_transaction_error)?;

        if removed {
            self.db.flush()?;
            tracing::debug!(id, "identity deleted");
        }
        Ok(removed)
    }

    // -- Reads -------------------------------------------------------------

    pub fn get(&self, id: &str) -> StoreResult<Option<IdentityRecord>> {
        match self.ids.get(id.as_bytes())? {
            Some(sequence) => self.read(&sequence),
            None => Ok(None),
        }
    }

    pub fn get_by_did(&self, did: &str) -> StoreResult<Option<IdentityRecord>> {
        match self.dids.get(did.as_bytes())? {
            Some(id) => {
                let id = String::from_utf8(id.to_vec())
                    .map_err(|e| StoreError::CorruptIndex(e.to_string()))?;
                self.get(&id)
            }
            None => Ok(None),
        }
    }

    /// All records, oldest first.
    pub fn list(&self) -> StoreResult<Vec<IdentityRecord>> {
        self.identities
            .iter()
            .values()
            .map(|bytes| {
                let bytes = bytes?;
                decode_record(&bytes)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    fn read(&self, sequence: &[u8]) -> StoreResult<Option<IdentityRecord>> {
        match self.identities.get(sequence)? {
            Some(bytes) => decode_record(&bytes).map(Some),
            None => Ok(None),
        }
    }

    // -- Export / import ---------------------------------------------------

    /// Pretty JSON envelope holding one record, or `None` if no such id.
    pub fn export_one(&self, id: &str) -> StoreResult<Option<String>> {
        match self.get(id)? {
            Some(record) => to_pretty_json(&ExportEnvelope::single(record)).map(Some),
            None => Ok(None),
        }
    }

    /// Pretty JSON envelope holding every record.
    pub fn export_all(&self) -> StoreResult<String> {
        to_pretty_json(&ExportEnvelope::batch(self.list()?))
    }

    /// Import records from an export envelope (single or batch).
    ///
    /// Per-record problems (missing fields, duplicate DIDs, wrong types) are
    /// collected into [`ImportSummary::errors`] and skipped; so is JSON that
    /// doesn't parse at all. Only storage failures return `Err`.
    pub fn import(&self, json: &str) -> StoreResult<ImportSummary> {
        let mut summary = ImportSummary::default();

        let parsed: serde_json::Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                summary.errors.push(format!("could not parse JSON: {}", e));
                return Ok(summary);
            }
        };

        let entries = match envelope_entries(&parsed) {
            Ok(entries) => entries,
            Err(e) => {
                summary.errors.push(e);
                return Ok(summary);
            }
        };

        for entry in entries {
            let record = match build_record(entry) {
                Ok(record) => record,
                Err(e) => {
                    summary.errors.push(e);
                    continue;
                }
            };
            match self.save(&record) {
                Ok(_) => summary.imported += 1,
                Err(StoreError::DuplicateDid(did)) => {
                    summary.errors.push(format!("duplicate DID: {}", did));
                }
                Err(StoreError::DuplicateId(id)) => {
                    summary.errors.push(format!("duplicate id: {}", id));
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            imported = summary.imported,
            skipped = summary.errors.len(),
            "identity import finished"
        );
        Ok(summary)
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// Re-derive keys and identifier from the stored seed and compare.
///
/// `Ok(true)` when seed, keys and DID all agree. A record whose seed is not
/// 32 bytes of hex is [`StoreError::InvalidRecord`].
pub fn verify_record(record: &IdentityRecord, codec: &IdentifierCodec) -> StoreResult<bool> {
    let seed = zeroize::Zeroizing::new(
        hex::decode(&record.seed).map_err(|e| StoreError::InvalidRecord(e.to_string()))?,
    );
    let keypair = KeyPair::derive(&seed, record.algorithm_type)
        .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
    let did = codec.encode_keypair(&keypair);

    let matches = keypair.public_key_hex() == record.public_key.to_ascii_lowercase()
        && constant_time_eq(
            keypair.private_key_hex().as_bytes(),
            record.private_key.to_ascii_lowercase().as_bytes(),
        )
        && did.did() == record.did_key;

    if !matches {
        tracing::warn!(id = %record.id, "stored identity does not match its seed");
    }
    Ok(matches)
}

fn from_transaction_error(err: TransactionError<StoreError>) -> StoreError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => StoreError::Sled(e),
    }
}

fn decode_record(bytes: &[u8]) -> StoreResult<IdentityRecord> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn to_pretty_json(envelope: &ExportEnvelope) -> StoreResult<String> {
    serde_json::to_string_pretty(envelope).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
