//! # Storage Module
//!
//! Persistence for derived identities.
//!
//! ```text
//! db.rs      IdentityStore: sled-backed save / get / list / rename / delete
//! export.rs  Export envelopes and lenient import parsing
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! DerivedIdentity -> IdentityRecord -> IdentityStore -> export JSON
//!                                            ^                |
//!                                            +---- import ----+
//! ```
//!
//! Records hold seeds and private keys in the clear. The store is a
//! convenience for a demonstrator, not a vault.

pub mod db;
pub mod export;

pub use db::{verify_record, IdentityStore, StoreError, StoreResult};
pub use export::{ExportEnvelope, ImportSummary};
