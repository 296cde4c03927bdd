//! # CLI Interface
//!
//! Defines the command-line argument structure for `seedkey` using `clap`
//! derive. Global flags map onto [`SeedKeyConfig`] and can all be set from
//! `SEEDKEY_*` environment variables.

use anyhow::{anyhow, bail, Result};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use seedkey_core::config::{parse_tag, SeedKeyConfig, ED25519_MULTICODEC};
use seedkey_core::{Algorithm, SeedProvenance};

use crate::logging::LogFormat;

/// SeedKey: seed to keypair to did:key.
///
/// Generates 32-byte seeds (local CSPRNG or a remote quantum RNG), scores
/// their entropy, derives Ed25519 or Dilithium2 keypairs from them, and
/// encodes the public key as a did:key identifier.
#[derive(Parser, Debug)]
#[command(
    name = "seedkey",
    about = "Deterministic identities from 32-byte seeds",
    version,
    propagate_version = true
)]
pub struct SeedKeyCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Log output format. Logs always go to stderr.
    #[arg(
        long,
        global = true,
        env = "SEEDKEY_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// More log output: `-v` for debug, `-vv` for trace. `RUST_LOG` wins.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Directory holding the identity store.
    #[arg(long, short = 'd', global = true, env = "SEEDKEY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// QRNG endpoint returning `{"data": [32 bytes], "success": true}`.
    #[arg(long, global = true, env = "SEEDKEY_QRNG_URL")]
    pub qrng_url: Option<String>,

    /// Transport timeout for the QRNG request, in seconds.
    #[arg(long, global = true, env = "SEEDKEY_QRNG_TIMEOUT_SECS")]
    pub qrng_timeout_secs: Option<u64>,

    /// Multicodec tag for Dilithium2 identifiers, as 4 hex digits.
    #[arg(long, global = true, env = "SEEDKEY_DILITHIUM_TAG")]
    pub dilithium_tag: Option<String>,
}

impl GlobalArgs {
    /// Defaults overlaid with whatever flags or env vars were given.
    pub fn to_config(&self) -> Result<SeedKeyConfig> {
        let mut config = SeedKeyConfig::default();
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(url) = &self.qrng_url {
            config.qrng_url = url.clone();
        }
        if let Some(secs) = self.qrng_timeout_secs {
            config.qrng_timeout_secs = secs;
        }
        if let Some(tag) = &self.dilithium_tag {
            let parsed =
                parse_tag(tag).ok_or_else(|| anyhow!("invalid multicodec tag '{}'", tag))?;
            if parsed == ED25519_MULTICODEC {
                bail!("multicodec tag '{}' is reserved for ed25519", tag);
            }
            config.dilithium2_tag = parsed;
        }
        Ok(config)
    }
}

/// Where a new seed comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Local CSPRNG.
    Prng,
    /// Remote quantum RNG.
    Qrng,
}

impl From<SourceArg> for SeedProvenance {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Prng => SeedProvenance::LocalPrng,
            SourceArg::Qrng => SeedProvenance::RemoteQrng,
        }
    }
}

fn parse_algorithm(s: &str) -> Result<Algorithm, String> {
    s.parse::<Algorithm>().map_err(|e| e.to_string())
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a 32-byte seed and score its entropy.
    Seed(SeedArgs),
    /// Score the entropy of hex-encoded bytes.
    Analyze(AnalyzeArgs),
    /// Derive a keypair and did:key from an existing seed.
    Derive(DeriveArgs),
    /// Create identities.
    #[command(subcommand)]
    Identity(IdentityCommand),
    /// Decode a did:key into its algorithm and public key.
    Decode(DidArgs),
    /// Print the DID document for a did:key.
    Document(DidArgs),
    /// Sign a message.
    Sign(SignArgs),
    /// Verify a signature. Exits non-zero if it does not verify.
    Verify(VerifyArgs),
    /// Derive from a seed, sign a test message and verify it.
    SelfTest(SelfTestArgs),
    /// Manage the local identity store.
    #[command(subcommand)]
    Store(StoreCommand),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[arg(long, short = 's', value_enum, default_value_t = SourceArg::Prng)]
    pub source: SourceArg,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Bytes to analyze, hex-encoded.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct DeriveArgs {
    /// 32-byte seed, hex-encoded.
    #[arg(long, env = "SEEDKEY_SEED")]
    pub seed: String,

    /// ed25519 or dilithium2.
    #[arg(long, short = 'a', value_parser = parse_algorithm, default_value = "ed25519")]
    pub algorithm: Algorithm,
}

#[derive(Subcommand, Debug)]
pub enum IdentityCommand {
    /// Generate a fresh seed and derive an identity from it.
    New(NewIdentityArgs),
}

#[derive(Args, Debug)]
pub struct NewIdentityArgs {
    #[arg(long, short = 's', value_enum, default_value_t = SourceArg::Prng)]
    pub source: SourceArg,

    #[arg(long, short = 'a', value_parser = parse_algorithm, default_value = "ed25519")]
    pub algorithm: Algorithm,

    /// Persist the identity in the store.
    #[arg(long)]
    pub save: bool,

    /// Display name for the saved identity.
    #[arg(long, requires = "save")]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct DidArgs {
    pub did: String,
}

/// Key material for `sign`: either a seed to derive from or a raw private key.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("key").required(true).args(["seed", "private_key"])))]
pub struct SignArgs {
    /// Message to sign (UTF-8).
    pub message: String,

    #[arg(long, short = 'a', value_parser = parse_algorithm, default_value = "ed25519")]
    pub algorithm: Algorithm,

    /// 32-byte seed, hex-encoded.
    #[arg(long, env = "SEEDKEY_SEED")]
    pub seed: Option<String>,

    /// Private key, hex-encoded.
    #[arg(long)]
    pub private_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Message that was signed (UTF-8).
    pub message: String,

    #[arg(long, short = 'a', value_parser = parse_algorithm, default_value = "ed25519")]
    pub algorithm: Algorithm,

    /// Signature, hex-encoded.
    #[arg(long)]
    pub signature: String,

    /// Public key, hex-encoded. Mutually exclusive with `--did`.
    #[arg(long, conflicts_with = "did", required_unless_present = "did")]
    pub public_key: Option<String>,

    /// Take the public key (and algorithm) from a did:key instead.
    #[arg(long)]
    pub did: Option<String>,
}

#[derive(Args, Debug)]
pub struct SelfTestArgs {
    /// 32-byte seed, hex-encoded.
    #[arg(long, env = "SEEDKEY_SEED")]
    pub seed: String,

    #[arg(long, short = 'a', value_parser = parse_algorithm, default_value = "ed25519")]
    pub algorithm: Algorithm,

    #[arg(long, short = 'm', default_value = "SeedKey self-test")]
    pub message: String,
}

#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// List stored identities, oldest first.
    List,
    /// Export one identity (by id) or all of them as JSON.
    Export(ExportArgs),
    /// Import identities from an export file.
    Import(ImportArgs),
    /// Set the display name of an identity.
    Rename(RenameArgs),
    /// Remove an identity.
    Delete(IdArgs),
    /// Re-derive an identity from its seed and check it still matches.
    Verify(IdArgs),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Identity id. Omit to export everything.
    pub id: Option<String>,

    /// Write to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    pub id: String,
    pub name: String,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: String,
}
