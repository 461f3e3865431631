// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for queue-entry matching, job status classification,
// and a full tracker evaluation in the printprobe-print crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use printprobe_core::config::PollingConfig;
use printprobe_core::types::{JobStatusFlags, PrintJobKey, QueueEntry};
use printprobe_print::tracker::JobTracker;

// ---------------------------------------------------------------------------
// Helper: a busy spooler queue
// ---------------------------------------------------------------------------

/// `len` unrelated jobs followed by the one we are looking for.
fn busy_queue(len: u32) -> Vec<QueueEntry> {
    let mut entries: Vec<QueueEntry> = (0..len)
        .map(|id| QueueEntry {
            job_id: id,
            document: format!("Microsoft Word - report-{id}.docx"),
            status: JobStatusFlags::SPOOLING | JobStatusFlags::PRINTING,
        })
        .collect();
    entries.push(QueueEntry {
        job_id: len,
        document: "label.usb (copy 3/3)".into(),
        status: JobStatusFlags::PRINTED,
    });
    entries
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Matching the last entry of a 256-job queue.
fn bench_find_match(c: &mut Criterion) {
    let entries = busy_queue(255);

    c.bench_function("find_match (256 jobs, last matches)", |b| {
        b.iter(|| {
            let found = JobTracker::find_match(black_box(&entries), black_box("label.usb"));
            assert!(found.is_some());
        });
    });
}

/// Classifying and describing every single-bit status.
fn bench_classify(c: &mut Criterion) {
    let statuses: Vec<JobStatusFlags> = (0..13).map(|bit| JobStatusFlags(1 << bit)).collect();

    c.bench_function("classify + describe (13 statuses)", |b| {
        b.iter(|| {
            for status in &statuses {
                black_box(status.classify());
                black_box(status.describe());
            }
        });
    });
}

/// One evaluation of a fresh key against a busy queue.
fn bench_evaluate(c: &mut Criterion) {
    let entries = busy_queue(63);
    let key = PrintJobKey::new("Sunmi V2", "label.usb");

    c.bench_function("evaluate (64 jobs, completed)", |b| {
        b.iter(|| {
            let mut tracker = JobTracker::new(PollingConfig::default());
            let decision = tracker.evaluate(&key, Ok(black_box(entries.clone())));
            black_box(decision);
        });
    });
}

criterion_group!(benches, bench_find_match, bench_classify, bench_evaluate);
criterion_main!(benches);
