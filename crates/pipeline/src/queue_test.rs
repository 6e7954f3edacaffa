//! Queue tests
//!
//! The blocking behaviours are exercised with real threads and generous
//! timeouts; assertions never depend on a sleep being "long enough" for
//! correctness, only for demonstrating that a blocked side stayed blocked.

use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::{PipelineError, Queue};

#[test]
fn fifo_order_single_producer() {
    let queue = Queue::new(10);
    for n in 0..5 {
        queue.put(n).unwrap();
    }
    queue.close();
    let drained: Vec<_> = std::iter::from_fn(|| queue.get()).collect();
    assert_eq!(drained, vec![0, 1, 2, 3, 4]);
}

#[test]
fn counters_balance_with_len() {
    let queue = Queue::new(4);
    queue.put('a').unwrap();
    queue.put('b').unwrap();
    assert_eq!(queue.put_count(), 2);
    assert_eq!(queue.get_count(), 0);
    assert_eq!(queue.len(), 2);

    queue.get().unwrap();
    assert_eq!(queue.get_count(), 1);
    assert_eq!(
        queue.put_count() - queue.get_count(),
        queue.len() as u64,
        "size == put_count - get_count"
    );
}

#[test]
fn put_after_close_is_rejected() {
    let queue = Queue::new(4);
    queue.close();
    assert!(matches!(queue.put(1), Err(PipelineError::Closed)));
    assert_eq!(queue.put_count(), 0);
}

#[test]
fn close_still_drains_buffered_values() {
    let queue = Queue::new(4);
    queue.put(1).unwrap();
    queue.put(2).unwrap();
    queue.close();

    assert_eq!(queue.get(), Some(1));
    assert_eq!(queue.get(), Some(2));
    assert_eq!(queue.get(), None);
    assert_eq!(queue.get(), None);
}

#[test]
fn close_is_idempotent() {
    let queue = Queue::<u8>::new(1);
    queue.close();
    queue.close();
    assert!(queue.is_closed());
}

#[test]
fn unbounded_queue_never_blocks_put() {
    let queue = Queue::new(0);
    for n in 0..10_000 {
        queue.put(n).unwrap();
    }
    assert_eq!(queue.len(), 10_000);
}

#[test]
fn bounded_put_blocks_until_a_get_makes_room() {
    let queue = Arc::new(Queue::new(1));
    queue.put(1).unwrap();

    let (started_tx, started_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();
    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            started_tx.send(()).unwrap();
            queue.put(2).unwrap();
            done_tx.send(()).unwrap();
        })
    };

    started_rx.recv().unwrap();
    // Full queue: the producer must still be waiting.
    assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

    assert_eq!(queue.get(), Some(1));
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    producer.join().unwrap();
    assert_eq!(queue.get(), Some(2));
}

#[test]
fn get_blocks_until_a_put_arrives() {
    let queue = Arc::new(Queue::new(4));
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.get())
    };

    thread::sleep(Duration::from_millis(50));
    queue.put(7).unwrap();
    assert_eq!(consumer.join().unwrap(), Some(7));
}

#[test]
fn blocked_put_fails_when_queue_closes() {
    let queue = Arc::new(Queue::new(1));
    queue.put(1).unwrap();

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.put(2))
    };

    thread::sleep(Duration::from_millis(50));
    queue.close();
    assert!(matches!(
        producer.join().unwrap(),
        Err(PipelineError::Closed)
    ));
}

#[test]
fn blocked_get_unblocks_on_close() {
    let queue = Arc::new(Queue::<u8>::new(4));
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.get())
    };

    thread::sleep(Duration::from_millis(50));
    queue.close();
    assert_eq!(consumer.join().unwrap(), None);
}

#[test]
fn every_value_is_delivered_exactly_once() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 250;
    const CONSUMERS: usize = 3;

    let queue = Arc::new(Queue::new(8));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for n in 0..PER_PRODUCER {
                    queue.put(p * PER_PRODUCER + n).unwrap();
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(value) = queue.get() {
                    seen.push(value);
                }
                seen
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    queue.close();

    let mut all = Vec::new();
    for consumer in consumers {
        all.extend(consumer.join().unwrap());
    }

    assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);
    let distinct: HashSet<_> = all.iter().copied().collect();
    assert_eq!(distinct.len(), PRODUCERS * PER_PRODUCER, "no duplicates");
    assert_eq!(queue.put_count(), queue.get_count());
}
