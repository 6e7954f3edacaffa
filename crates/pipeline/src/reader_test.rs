//! Reader stage tests

use std::sync::Arc;

use bytes::Bytes;

use bulkd_metrics::{keys, Registry};
use bulkd_protocol::{Record, RecordKind};

use crate::{Queue, Reader};

/// Run a reader over `chunks` and return everything it emitted.
fn run_reader(chunks: &[&[u8]], registry: &Arc<Registry>) -> Vec<Record> {
    let mixer_input = Arc::new(Queue::new(0));
    let mut reader = Reader::new(4, Arc::clone(&mixer_input), registry.clone());
    reader.run().unwrap();
    for chunk in chunks {
        reader.put(Bytes::copy_from_slice(chunk)).unwrap();
    }
    reader.join();

    mixer_input.close();
    std::iter::from_fn(|| mixer_input.get()).collect()
}

fn payload(record: &Record) -> String {
    match record.kind() {
        RecordKind::Command(command) => String::from_utf8_lossy(command.payload()).into_owned(),
        other => panic!("expected a command record, got {other:?}"),
    }
}

#[test]
fn commands_are_tagged_and_followed_by_eof() {
    let registry = Arc::new(Registry::new());
    let records = run_reader(&[b"a\nb\n"], &registry);

    assert_eq!(records.len(), 3);
    assert_eq!(payload(&records[0]), "a");
    assert_eq!(payload(&records[1]), "b");
    assert_eq!(*records[2].kind(), RecordKind::Eof);

    let producer = records[0].producer();
    assert!(records.iter().all(|r| r.producer() == producer));

    assert_eq!(registry.value(keys::READER_MIX_COMMANDS), 2);
    assert_eq!(registry.value(keys::READER_LINE_COUNT), 2);
    assert_eq!(registry.value(keys::READER_LINE_SIZE), 2);
    assert_eq!(registry.value(keys::READER_MIX_EOF), 0);
}

#[test]
fn blocks_pass_through_whole_across_chunk_boundaries() {
    let registry = Arc::new(Registry::new());
    let records = run_reader(&[b"{\nfirst\nsec", b"ond\n}\n"], &registry);

    assert_eq!(records.len(), 2);
    let RecordKind::Block(bulk) = records[0].kind() else {
        panic!("expected a block record");
    };
    let payloads: Vec<_> = bulk
        .commands()
        .iter()
        .map(|c| String::from_utf8_lossy(c.payload()).into_owned())
        .collect();
    assert_eq!(payloads, vec!["first", "second"]);
    assert_eq!(*records[1].kind(), RecordKind::Eof);

    assert_eq!(registry.value(keys::READER_MIX_BLOCK_COUNT), 1);
    assert_eq!(registry.value(keys::READER_MIX_BLOCK_SIZE), 2);
}

#[test]
fn unterminated_block_is_dropped_and_counted() {
    let registry = Arc::new(Registry::new());
    let records = run_reader(&[b"{\na\nb\n"], &registry);

    // Only the Eof makes it out; the open block is abandoned.
    assert_eq!(records.len(), 1);
    assert_eq!(*records[0].kind(), RecordKind::Eof);
    assert_eq!(registry.value(keys::READER_MIX_EOF), 1);
}

#[test]
fn two_readers_get_distinct_producers() {
    let registry = Arc::new(Registry::new());
    let mixer_input = Arc::new(Queue::new(0));
    let first = Reader::new(4, Arc::clone(&mixer_input), registry.clone());
    let second = Reader::new(4, Arc::clone(&mixer_input), registry.clone());
    assert_ne!(first.producer(), second.producer());
}
