// Derivation pipeline benchmarks for SeedKey.
//
// Covers SHAKE256 expansion, entropy analysis, Ed25519 and Dilithium2 key
// derivation, did:key encoding, and signing for both algorithms.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use seedkey_core::crypto::kdf::{expand, DeterministicRandomSource};
use seedkey_core::crypto::keys::{Algorithm, KeyPair};
use seedkey_core::entropy::analyze;
use seedkey_core::identity::IdentifierCodec;

const SEED: [u8; 32] = [0x42; 32];

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdf/expand");
    for len in [32usize, 1024, 4096, 65536] {
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| expand(&SEED, len, "BENCH").unwrap());
        });
    }
    group.finish();
}

fn bench_deterministic_source(c: &mut Criterion) {
    c.bench_function("kdf/deterministic_source_take_past_pool", |b| {
        b.iter(|| {
            let mut src = DeterministicRandomSource::new(&SEED, "BENCH").unwrap();
            src.take(10_000)
        });
    });
}

fn bench_entropy(c: &mut Criterion) {
    let mut group = c.benchmark_group("entropy/analyze");
    for len in [32usize, 4096, 65536] {
        let data = expand(&SEED, len, "ENTROPY").unwrap();
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| analyze(data).unwrap());
        });
    }
    group.finish();
}

fn bench_derive(c: &mut Criterion) {
    c.bench_function("keys/derive_ed25519", |b| {
        b.iter(|| KeyPair::derive(&SEED, Algorithm::Ed25519).unwrap());
    });
    c.bench_function("keys/derive_dilithium2", |b| {
        b.iter(|| KeyPair::derive(&SEED, Algorithm::Dilithium2).unwrap());
    });
}

fn bench_encode(c: &mut Criterion) {
    let codec = IdentifierCodec::default();
    let ed = KeyPair::derive(&SEED, Algorithm::Ed25519).unwrap();
    let dil = KeyPair::derive(&SEED, Algorithm::Dilithium2).unwrap();

    c.bench_function("did/encode_ed25519", |b| {
        b.iter(|| codec.encode_keypair(&ed));
    });
    c.bench_function("did/encode_dilithium2", |b| {
        b.iter(|| codec.encode_keypair(&dil));
    });
}

fn bench_sign(c: &mut Criterion) {
    let message = b"benchmark message for seedkey";
    for algorithm in Algorithm::ALL {
        let kp = KeyPair::derive(&SEED, algorithm).unwrap();
        let sig = kp.sign(message).unwrap();
        c.bench_function(&format!("sign/{}", algorithm), |b| {
            b.iter(|| kp.sign(message).unwrap());
        });
        c.bench_function(&format!("verify/{}", algorithm), |b| {
            b.iter(|| kp.verify(message, sig.as_bytes()));
        });
    }
}

criterion_group!(
    benches,
    bench_expand,
    bench_deterministic_source,
    bench_entropy,
    bench_derive,
    bench_encode,
    bench_sign
);
criterion_main!(benches);
