// Copyright (c) 2026 SeedKey Contributors. MIT License.
// See LICENSE for details.

//! # SeedKey CLI
//!
//! Entry point for the `seedkey` binary. Parses CLI arguments, initializes
//! logging, builds a [`SeedKeyConfig`] from flags and environment, and
//! drives the library.
//!
//! Command output (JSON, hex) goes to stdout; logs go to stderr.

mod cli;
mod logging;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use zeroize::Zeroizing;

use seedkey_core::config::{SeedKeyConfig, EXPORT_FORMAT_VERSION};
use seedkey_core::crypto::signatures;
use seedkey_core::entropy::analyze;
use seedkey_core::storage::verify_record;
use seedkey_core::{
    encoding, DerivedIdentity, IdentifierCodec, IdentityStore, KeyPair, Seed, SeedProvenance,
    SeedSource,
};

use cli::{Commands, IdentityCommand, SeedKeyCli, StoreCommand};

/// Store directory name under the data dir.
const STORE_DIR: &str = "identities";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = SeedKeyCli::parse();
    logging::init_logging(cli.global.log_format, cli.global.verbose);

    let config = cli.global.to_config()?;
    let codec = IdentifierCodec::from_config(&config).context("invalid configuration")?;

    match cli.command {
        Commands::Seed(args) => generate_seed(&config, args).await,
        Commands::Analyze(args) => analyze_hex(args),
        Commands::Derive(args) => derive(&codec, args),
        Commands::Identity(IdentityCommand::New(args)) => new_identity(&config, &codec, args).await,
        Commands::Decode(args) => decode_did(&codec, args),
        Commands::Document(args) => {
            let document = codec
                .resolve_document(&args.did)
                .with_context(|| format!("cannot resolve {}", args.did))?;
            println!("{}", document.to_json()?);
            Ok(())
        }
        Commands::Sign(args) => sign(args),
        Commands::Verify(args) => verify(&codec, args),
        Commands::SelfTest(args) => self_test(args),
        Commands::Store(cmd) => run_store(&config, &codec, cmd),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_seed(hex_seed: &str) -> Result<Seed> {
    Seed::from_hex(hex_seed, SeedProvenance::LocalPrng).context("invalid seed")
}

fn parse_hex(label: &str, value: &str) -> Result<Vec<u8>> {
    encoding::from_hex(value).with_context(|| format!("invalid {}", label))
}

fn seed_source(config: &SeedKeyConfig, provenance: SeedProvenance) -> Result<SeedSource> {
    match provenance {
        SeedProvenance::LocalPrng => Ok(SeedSource::local_only()),
        SeedProvenance::RemoteQrng => {
            SeedSource::from_config(config).context("failed to build QRNG client")
        }
    }
}

fn open_store(config: &SeedKeyConfig) -> Result<IdentityStore> {
    let dir = &config.data_dir;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create data directory: {}", dir.display()))?;
    let path = dir.join(STORE_DIR);
    IdentityStore::open(&path)
        .with_context(|| format!("failed to open identity store at {}", path.display()))
}

// ---------------------------------------------------------------------------
// Seeds and keys
// ---------------------------------------------------------------------------

async fn generate_seed(config: &SeedKeyConfig, args: cli::SeedArgs) -> Result<()> {
    let provenance = SeedProvenance::from(args.source);
    let seed = seed_source(config, provenance)?
        .generate_seed(provenance)
        .await
        .context("seed generation failed")?;
    let report = analyze(seed.as_bytes())?;

    tracing::info!(
        provenance = %seed.provenance(),
        quality = report.quality_score,
        "seed generated"
    );

    print_json(&json!({
        "seed": seed.to_hex().as_str(),
        "provenance": seed.provenance(),
        "metadata": seed.metadata(),
        "entropy": report,
    }))
}

fn analyze_hex(args: cli::AnalyzeArgs) -> Result<()> {
    let bytes = parse_hex("hex input", &args.hex)?;
    print_json(&analyze(&bytes)?)
}

fn derive(codec: &IdentifierCodec, args: cli::DeriveArgs) -> Result<()> {
    let seed = parse_seed(&args.seed)?;
    let identity = DerivedIdentity::derive(seed, args.algorithm, codec)?;

    print_json(&json!({
        "algorithm": identity.keypair.algorithm().info(),
        "did": identity.did,
        "publicKey": identity.keypair.public_key_hex(),
        "privateKey": identity.keypair.private_key_hex().as_str(),
    }))
}

async fn new_identity(
    config: &SeedKeyConfig,
    codec: &IdentifierCodec,
    args: cli::NewIdentityArgs,
) -> Result<()> {
    let provenance = SeedProvenance::from(args.source);
    let seed = seed_source(config, provenance)?
        .generate_seed(provenance)
        .await
        .context("seed generation failed")?;

    let identity = DerivedIdentity::derive(seed, args.algorithm, codec)?;
    let mut record = identity.to_record();
    if let Some(name) = args.name {
        record = record.with_name(name);
    }

    if args.save {
        let store = open_store(config)?;
        store.save(&record).context("failed to save identity")?;
        store.flush()?;
        tracing::info!(id = %record.id, did = %record.did_key, "identity saved");
    }

    print_json(&record)
}

fn decode_did(codec: &IdentifierCodec, args: cli::DidArgs) -> Result<()> {
    let resolved = codec
        .decode(&args.did)
        .with_context(|| format!("cannot decode {}", args.did))?;

    print_json(&json!({
        "algorithm": resolved.algorithm,
        "tag": encoding::to_hex(&resolved.tag),
        "publicKey": encoding::to_hex(&resolved.public_key),
        "experimental": resolved.experimental,
    }))
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

fn sign(args: cli::SignArgs) -> Result<()> {
    let message = args.message.as_bytes();
    let signature = match (&args.seed, &args.private_key) {
        (Some(seed), _) => {
            let seed = parse_seed(seed)?;
            KeyPair::derive(seed.as_bytes(), args.algorithm)?.sign(message)?
        }
        (None, Some(key)) => {
            let key = Zeroizing::new(parse_hex("private key", key)?);
            signatures::sign(message, &key, args.algorithm)?
        }
        (None, None) => bail!("either --seed or --private-key is required"),
    };
    println!("{}", signature.to_hex());
    Ok(())
}

fn verify(codec: &IdentifierCodec, args: cli::VerifyArgs) -> Result<()> {
    let (public_key, algorithm) = match (&args.did, &args.public_key) {
        (Some(did), _) => {
            let resolved = codec
                .decode(did)
                .with_context(|| format!("cannot decode {}", did))?;
            (resolved.public_key, resolved.algorithm)
        }
        (None, Some(key)) => (parse_hex("public key", key)?, args.algorithm),
        (None, None) => bail!("either --public-key or --did is required"),
    };
    let signature = parse_hex("signature", &args.signature)?;

    let valid = signatures::verify(args.message.as_bytes(), &signature, &public_key, algorithm);
    print_json(&json!({ "algorithm": algorithm, "valid": valid }))?;
    if !valid {
        bail!("signature did not verify");
    }
    Ok(())
}

fn self_test(args: cli::SelfTestArgs) -> Result<()> {
    let seed = parse_seed(&args.seed)?;
    let keypair = KeyPair::derive(seed.as_bytes(), args.algorithm)?;
    let report = keypair.self_test(args.message.as_bytes());
    print_json(&report)?;
    if !report.success {
        bail!(
            "self-test failed: {}",
            report.error.as_deref().unwrap_or("signature did not verify")
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

fn run_store(config: &SeedKeyConfig, codec: &IdentifierCodec, cmd: StoreCommand) -> Result<()> {
    let store = open_store(config)?;

    match cmd {
        StoreCommand::List => {
            for record in store.list()? {
                println!(
                    "{}  {:<24}  {:<10}  {}",
                    record.id,
                    record.display_name(),
                    record.algorithm_type.to_string(),
                    record.did_key
                );
            }
        }
        StoreCommand::Export(args) => {
            let json = match &args.id {
                Some(id) => store
                    .export_one(id)?
                    .ok_or_else(|| anyhow!("no identity with id {}", id))?,
                None => store.export_all()?,
            };
            match &args.out {
                Some(path) => write_private(path, &json)?,
                None => println!("{}", json),
            }
        }
        StoreCommand::Import(args) => {
            let json = std::fs::read_to_string(&args.file)
                .with_context(|| format!("failed to read {}", args.file.display()))?;
            let summary = store.import(&json)?;
            store.flush()?;
            for error in &summary.errors {
                tracing::warn!(%error, "identity skipped");
            }
            print_json(&summary)?;
        }
        StoreCommand::Rename(args) => {
            if !store.rename(&args.id, &args.name)? {
                bail!("no identity with id {}", args.id);
            }
            store.flush()?;
        }
        StoreCommand::Delete(args) => {
            if !store.delete(&args.id)? {
                bail!("no identity with id {}", args.id);
            }
            store.flush()?;
        }
        StoreCommand::Verify(args) => {
            let record = store
                .get(&args.id)?
                .ok_or_else(|| anyhow!("no identity with id {}", args.id))?;
            let valid = verify_record(&record, codec)?;
            print_json(&json!({ "id": record.id, "valid": valid }))?;
            if !valid {
                bail!("identity {} does not match its seed", args.id);
            }
        }
    }
    Ok(())
}

/// Write an export file readable only by its owner (on Unix).
fn write_private(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(path = %path.display(), "export written");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("seedkey {}", env!("CARGO_PKG_VERSION"));
    println!("export  {}", EXPORT_FORMAT_VERSION);
    println!("rustc   {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
