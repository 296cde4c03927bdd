//! Persistent shape of a derived identity.
//!
//! Byte fields are lowercase hex strings and field names are camelCase,
//! which keeps exported JSON readable and stable across versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::keys::{Algorithm, KeyPair};
use crate::identity::did::DidKey;
use crate::seed::{Seed, SeedProvenance};

fn default_algorithm() -> Algorithm {
    Algorithm::Ed25519
}

/// One saved identity.
///
/// Holds the seed and private key in the clear (hex). Anyone who can read
/// the store can impersonate every identity in it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    pub did_key: String,
    pub seed: String,
    pub private_key: String,
    pub public_key: String,
    pub multibase: String,
    pub vm_id: String,
    pub created_at: DateTime<Utc>,
    pub generation_type: SeedProvenance,
    #[serde(default = "default_algorithm")]
    pub algorithm_type: Algorithm,
}

impl IdentityRecord {
    /// Snapshot a derivation. Gets a fresh UUIDv4 id and the current time.
    pub fn from_derivation(seed: &Seed, keypair: &KeyPair, did: &DidKey) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            custom_name: None,
            did_key: did.did().to_string(),
            seed: seed.to_hex().to_string(),
            private_key: keypair.private_key_hex().to_string(),
            public_key: keypair.public_key_hex(),
            multibase: did.multibase().to_string(),
            vm_id: did.verification_method_id().to_string(),
            created_at: Utc::now(),
            generation_type: seed.provenance(),
            algorithm_type: keypair.algorithm(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    /// `custom_name`, or a shortened DID when unnamed.
    pub fn display_name(&self) -> String {
        match &self.custom_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => {
                let shown: String = self.did_key.chars().take(24).collect();
                format!("{}...", shown)
            }
        }
    }
}

impl Drop for IdentityRecord {
    fn drop(&mut self) {
        self.seed.zeroize();
        self.private_key.zeroize();
    }
}

impl std::fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("id", &self.id)
            .field("custom_name", &self.custom_name)
            .field("did_key", &self.did_key)
            .field("algorithm_type", &self.algorithm_type)
            .field("generation_type", &self.generation_type)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
