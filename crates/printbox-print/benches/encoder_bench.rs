// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for receipt encoding and payload digests in the
// printbox-print crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use printbox_core::types::{Job, JobId};
use printbox_print::escpos::{self, ReceiptEncoder};

/// A message at the submission form's 240-character limit.
fn max_length_job() -> Job {
    let text = "Greetings from the other side of the internet! ".repeat(6);
    Job::new(JobId(1), &text[..240], "203.0.113.42")
}

/// Benchmark encoding a typical short message and a max-length one.
fn bench_encode(c: &mut Criterion) {
    let encoder = ReceiptEncoder::default();
    let short = Job::new(JobId(1), "hi there :)", "203.0.113.42");
    let long = max_length_job();

    c.bench_function("encode (short message)", |b| {
        b.iter(|| black_box(encoder.encode(black_box(&short))));
    });

    c.bench_function("encode (240 chars)", |b| {
        b.iter(|| black_box(encoder.encode(black_box(&long))));
    });

    // Non-ASCII input exercises the code page mapping and replacement path.
    let accented = Job::new(JobId(2), "Olá! Ça va? “Grüße” — 🎉 ".repeat(8), "cafe");
    c.bench_function("encode (non-ASCII)", |b| {
        b.iter(|| black_box(encoder.encode(black_box(&accented))));
    });
}

/// Benchmark the SHA-256 digest logged for every delivery.
fn bench_digest(c: &mut Criterion) {
    let frames = ReceiptEncoder::default().encode(&max_length_job());

    c.bench_function("payload_digest_sha256 (240 chars)", |b| {
        b.iter(|| black_box(escpos::digest(black_box(&frames))));
    });
}

criterion_group!(benches, bench_encode, bench_digest);
criterion_main!(benches);
