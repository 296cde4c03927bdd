//! Export envelopes and lenient import parsing.
//!
//! Exports look like this:
//!
//! ```text
//! { "version": "1.0.0", "exportedAt": "...", "identity": { ... } }       // one
//! { "version": "1.0.0", "exportedAt": "...", "identities": [ ... ] }     // all
//! ```
//!
//! Import accepts either shape, and is forgiving about what's inside: older
//! exports may lack `multibase`, `vmId`, `createdAt`, `generationType` or
//! `algorithmType`, and those get sensible defaults. What it won't forgive
//! is a record without `didKey`, `seed`, `privateKey` and `publicKey`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DID_KEY_PREFIX, EXPORT_FORMAT_VERSION};
use crate::crypto::keys::Algorithm;
use crate::identity::IdentityRecord;
use crate::seed::SeedProvenance;

/// The JSON wrapper written by `export_one` / `export_all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identities: Option<Vec<IdentityRecord>>,
}

impl ExportEnvelope {
    pub fn single(record: IdentityRecord) -> Self {
        Self {
            version: EXPORT_FORMAT_VERSION.to_string(),
            exported_at: Utc::now(),
            identity: Some(record),
            identities: None,
        }
    }

    pub fn batch(records: Vec<IdentityRecord>) -> Self {
        Self {
            version: EXPORT_FORMAT_VERSION.to_string(),
            exported_at: Utc::now(),
            identity: None,
            identities: Some(records),
        }
    }
}

/// Outcome of an import. Errors are per record and never abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub errors: Vec<String>,
}

/// One imported entry, before defaults are filled in.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportCandidate {
    custom_name: Option<String>,
    did_key: Option<String>,
    seed: Option<String>,
    private_key: Option<String>,
    public_key: Option<String>,
    multibase: Option<String>,
    #[serde(alias = "verificationMethodId")]
    vm_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    generation_type: Option<SeedProvenance>,
    algorithm_type: Option<Algorithm>,
}

/// Pull the list of entries out of an envelope. `identity` wins over
/// `identities`; neither present means an empty list.
pub(crate) fn envelope_entries(
    json: &serde_json::Value,
) -> Result<Vec<serde_json::Value>, String> {
    if let Some(version) = json.get("version").and_then(|v| v.as_str()) {
        if version != EXPORT_FORMAT_VERSION {
            tracing::warn!(version, "importing from an unrecognized export version");
        }
    }

    match json.get("identity") {
        Some(single) if !single.is_null() => return Ok(vec![single.clone()]),
        _ => {}
    }

    match json.get("identities") {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err("invalid file format: `identities` is not an array".into()),
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

/// Turn a raw entry into a full record with a fresh id.
pub(crate) fn build_record(entry: serde_json::Value) -> Result<IdentityRecord, String> {
    let candidate: ImportCandidate =
        serde_json::from_value(entry).map_err(|e| format!("could not parse identity: {}", e))?;

    let (Some(did_key), Some(seed), Some(private_key), Some(public_key)) = (
        non_empty(candidate.did_key),
        non_empty(candidate.seed),
        non_empty(candidate.private_key),
        non_empty(candidate.public_key),
    ) else {
        return Err("invalid identity: missing required fields".into());
    };

    let multibase = non_empty(candidate.multibase).unwrap_or_else(|| {
        did_key
            .strip_prefix(DID_KEY_PREFIX)
            .unwrap_or(&did_key)
            .to_string()
    });
    let vm_id =
        non_empty(candidate.vm_id).unwrap_or_else(|| format!("{}#{}", did_key, multibase));

    Ok(IdentityRecord {
        id: uuid::Uuid::new_v4().to_string(),
        custom_name: non_empty(candidate.custom_name),
        did_key,
        seed,
        private_key,
        public_key,
        multibase,
        vm_id,
        created_at: candidate.created_at.unwrap_or_else(Utc::now),
        generation_type: candidate
            .generation_type
            .unwrap_or(SeedProvenance::LocalPrng),
        algorithm_type: candidate.algorithm_type.unwrap_or(Algorithm::Ed25519),
    })
}

/// Shorten a DID for error messages.
pub(crate) fn short_did(did: &str) -> String {
    let shown: String = did.chars().take(20).collect();
    format!("{}...", shown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DID: &str = "did:key:z6Mkon3Necd6NkkyfoGoHxid2znGc59LU3K7mubaRcFbLfLX";

    fn minimal() -> serde_json::Value {
        json!({
            "didKey": DID,
            "seed": "01".repeat(32),
            "privateKey": "01".repeat(32),
            "publicKey": "8a88e3dd7409f195fd52db2d3cba5d72ca6709bf1d94121bf3748801b40f6f5c"
        })
    }

    #[test]
    fn defaults_are_filled() {
        let record = build_record(minimal()).unwrap();
        assert_eq!(record.multibase, &DID["did:key:".len()..]);
        assert_eq!(record.vm_id, format!("{}#{}", DID, record.multibase));
        assert_eq!(record.generation_type, SeedProvenance::LocalPrng);
        assert_eq!(record.algorithm_type, Algorithm::Ed25519);
        assert!(uuid::Uuid::parse_str(&record.id).is_ok());
    }

    #[test]
    fn verification_method_id_spelling_accepted() {
        let vm = format!("{}#key-1", DID);
        let mut entry = minimal();
        entry["verificationMethodId"] = json!(vm);
        assert_eq!(build_record(entry).unwrap().vm_id, vm);

        let mut entry = minimal();
        entry["vmId"] = json!(vm);
        assert_eq!(build_record(entry).unwrap().vm_id, vm);
    }

    #[test]
    fn incoming_id_is_replaced() {
        let mut entry = minimal();
        entry["id"] = json!("attacker-chosen");
        let record = build_record(entry).unwrap();
        assert_ne!(record.id, "attacker-chosen");
    }

    #[test]
    fn missing_required_fields_rejected() {
        for field in ["didKey", "seed", "privateKey", "publicKey"] {
            let mut entry = minimal();
            entry.as_object_mut().unwrap().remove(field);
            assert!(build_record(entry).is_err(), "{}", field);

            let mut entry = minimal();
            entry[field] = json!("");
            assert!(build_record(entry).is_err(), "empty {}", field);
        }
    }

    #[test]
    fn mistyped_entry_rejected() {
        let mut entry = minimal();
        entry["generationType"] = json!("DICE");
        assert!(build_record(entry).is_err());
        assert!(build_record(json!("just a string")).is_err());
    }

    #[test]
    fn envelope_shapes() {
        let single = json!({ "version": "1.0.0", "identity": minimal() });
        assert_eq!(envelope_entries(&single).unwrap().len(), 1);

        let batch = json!({ "identities": [minimal(), minimal()] });
        assert_eq!(envelope_entries(&batch).unwrap().len(), 2);

        assert!(envelope_entries(&json!({})).unwrap().is_empty());
        assert!(envelope_entries(&json!({ "identities": 5 })).is_err());
    }

    #[test]
    fn short_did_truncates() {
        assert_eq!(short_did(DID), "did:key:z6Mkon3Necd6...");
    }
}
