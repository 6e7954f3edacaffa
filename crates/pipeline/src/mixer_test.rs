//! Mixer tests
//!
//! Each test drives the real stage: records in through `put`, bulks out
//! of an unbounded downstream queue after `join`.

use std::sync::Arc;

use bulkd_metrics::{keys, NullRecorder, Registry};
use bulkd_protocol::{Bulk, Command, ProducerId, Record};

use crate::{Mixer, Queue};

fn command(producer: ProducerId, payload: &str) -> Record {
    Record::command(producer, Command::at(100, payload.as_bytes().to_vec()))
}

fn block(producer: ProducerId, payloads: &[&str]) -> Record {
    let commands = payloads
        .iter()
        .map(|p| Command::at(100, p.as_bytes().to_vec()))
        .collect::<Vec<_>>();
    Record::block(producer, Bulk::from(commands))
}

fn payloads(bulk: &Bulk) -> Vec<String> {
    bulk.commands()
        .iter()
        .map(|c| String::from_utf8_lossy(c.payload()).into_owned())
        .collect()
}

/// Feed `records` through a size-N mixer and collect the emitted bulks.
fn mix(bulk_size: usize, records: Vec<Record>) -> Vec<Vec<String>> {
    let downstream = Arc::new(Queue::new(0));
    let mut mixer = Mixer::new(bulk_size, 4, Arc::clone(&downstream), Arc::new(NullRecorder));
    mixer.run().unwrap();
    for record in records {
        mixer.put(record).unwrap();
    }
    mixer.join();

    downstream.close();
    std::iter::from_fn(|| downstream.get())
        .map(|bulk| payloads(&bulk))
        .collect()
}

#[test]
fn coalesces_singletons_into_size_n_bulks() {
    let p = ProducerId::next();
    let records = ["a", "b", "c", "d", "e", "f"]
        .iter()
        .map(|s| command(p, s))
        .collect();
    let bulks = mix(3, records);
    assert_eq!(bulks, vec![vec!["a", "b", "c"], vec!["d", "e", "f"]]);
}

#[test]
fn block_flushes_own_producer_then_passes_through() {
    let p = ProducerId::next();
    let records = vec![
        command(p, "a"),
        command(p, "b"),
        block(p, &["c", "d", "e"]),
        command(p, "f"),
        command(p, "g"),
        Record::eof(p),
    ];
    let bulks = mix(3, records);
    assert_eq!(
        bulks,
        vec![vec!["a", "b"], vec!["c", "d", "e"], vec!["f", "g"]]
    );
}

#[test]
fn two_producers_share_bulks_until_eof() {
    let x = ProducerId::next();
    let y = ProducerId::next();
    let records = vec![
        command(x, "x1"),
        command(y, "y1"),
        command(x, "x2"),
        command(y, "y2"),
        Record::eof(y),
        Record::eof(x),
    ];
    let bulks = mix(3, records);
    // First three interleaved singletons fill one bulk; Y's disconnect
    // flushes the remainder. X's Eof then finds nothing of X pending.
    assert_eq!(bulks, vec![vec!["x1", "y1", "x2"], vec!["y2"]]);
}

#[test]
fn block_does_not_flush_unrelated_producers() {
    let x = ProducerId::next();
    let y = ProducerId::next();
    let records = vec![
        command(y, "y1"),
        block(x, &["a", "b"]),
        Record::eof(y),
        Record::eof(x),
    ];
    let bulks = mix(5, records);
    // X's block arrives while only Y has pending commands: the block goes
    // out alone and Y's singleton waits for Y's own flush.
    assert_eq!(bulks, vec![vec!["a", "b"], vec!["y1"]]);
}

#[test]
fn eof_without_contribution_flushes_nothing() {
    let x = ProducerId::next();
    let y = ProducerId::next();
    let records = vec![command(x, "x1"), Record::eof(y)];
    let bulks = mix(5, records);
    // Y never contributed; X's command is flushed by mixer shutdown only.
    assert_eq!(bulks, vec![vec!["x1"]]);
}

#[test]
fn shutdown_flushes_pending() {
    let p = ProducerId::next();
    let bulks = mix(10, vec![command(p, "a"), command(p, "b")]);
    assert_eq!(bulks, vec![vec!["a", "b"]]);
}

#[test]
fn zero_bulk_size_has_no_cap() {
    let p = ProducerId::next();
    let mut records: Vec<_> = (0..50).map(|n| command(p, &format!("c{n}"))).collect();
    records.push(Record::eof(p));
    let bulks = mix(0, records);
    assert_eq!(bulks.len(), 1);
    assert_eq!(bulks[0].len(), 50);
}

#[test]
fn empty_block_is_not_forwarded() {
    let p = ProducerId::next();
    let bulks = mix(3, vec![Record::block(p, Bulk::new())]);
    assert!(bulks.is_empty());
}

#[test]
fn emission_metrics_count_bulks_and_commands() {
    let p = ProducerId::next();
    let registry = Arc::new(Registry::new());
    let downstream = Arc::new(Queue::new(0));
    let mut mixer = Mixer::new(2, 4, Arc::clone(&downstream), registry.clone());
    mixer.run().unwrap();
    for payload in ["a", "b", "c"] {
        mixer.put(command(p, payload)).unwrap();
    }
    mixer.join();

    // [a, b] by size cap, [c] by shutdown flush.
    assert_eq!(registry.value(keys::MIXER_SEND_BLOCKS), 2);
    assert_eq!(registry.value(keys::MIXER_SEND_COMMANDS), 3);
}
