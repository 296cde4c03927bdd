//! # Identity Module
//!
//! Where a seed becomes something you can hand to other people.
//!
//! The identity stack is layered:
//!
//! 1. **Seed**: 32 bytes, see [`crate::seed`].
//! 2. **Keypair**: derived from the seed, see [`crate::crypto::keys`].
//! 3. **did:key**: the public key, multicodec-tagged and base58btc-encoded
//!    into a W3C DID. This is what users see, share and paste.
//! 4. **Record**: everything above, flattened into a storable, exportable
//!    JSON shape.
//!
//! [`DerivedIdentity`] runs steps 2 and 3 in one go.

pub mod did;
pub mod record;

pub use did::{decode, encode, DidDocument, DidKey, IdentifierCodec, ResolvedDid, VerificationMethod};
pub use record::IdentityRecord;

use crate::crypto::keys::{Algorithm, KeyError, KeyPair};
use crate::seed::Seed;

/// A seed together with the keypair and identifier it derives.
#[derive(Debug, Clone)]
pub struct DerivedIdentity {
    pub seed: Seed,
    pub keypair: KeyPair,
    pub did: DidKey,
}

impl DerivedIdentity {
    /// Seed -> keypair -> identifier.
    pub fn derive(
        seed: Seed,
        algorithm: Algorithm,
        codec: &IdentifierCodec,
    ) -> Result<Self, KeyError> {
        let keypair = KeyPair::derive(seed.as_bytes(), algorithm)?;
        let did = codec.encode_keypair(&keypair);
        tracing::debug!(
            %algorithm,
            provenance = %seed.provenance(),
            did = %did,
            "identity derived"
        );
        Ok(Self { seed, keypair, did })
    }

    pub fn to_record(&self) -> IdentityRecord {
        IdentityRecord::from_derivation(&self.seed, &self.keypair, &self.did)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::SeedProvenance;

    #[test]
    fn derive_matches_golden_identifier() {
        let seed = Seed::from_bytes([1u8; 32], SeedProvenance::LocalPrng);
        let id = DerivedIdentity::derive(seed, Algorithm::Ed25519, &IdentifierCodec::default())
            .unwrap();
        assert_eq!(
            id.did.did(),
            "did:key:z6Mkon3Necd6NkkyfoGoHxid2znGc59LU3K7mubaRcFbLfLX"
        );
        let (_, pk) = decode(id.did.did()).unwrap();
        assert_eq!(pk, id.keypair.public_key());
    }

    #[test]
    fn record_roundtrips_through_json() {
        let seed = Seed::from_bytes([4u8; 32], SeedProvenance::LocalPrng);
        let id = DerivedIdentity::derive(seed, Algorithm::Dilithium2, &IdentifierCodec::default())
            .unwrap();
        let record = id.to_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: IdentityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.public_key.len(), 2 * 1312);
    }
}
