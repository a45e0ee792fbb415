//! Single-slot, latest-wins record output.
//! A depth-1 crossbeam channel: publishing never blocks, and a full slot is
//! emptied and refilled so the consumer only ever sees the newest sweep.

use crossbeam_channel as cb;

use crate::record::Record;

/// Consumer end of the output slot.
pub type RecordReceiver = cb::Receiver<Record>;

/// Result of one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    /// Slot was empty.
    Delivered,
    /// A stale record was discarded to make room.
    ReplacedStale,
}

/// Acquisition end of the output slot. Keeps its own receiver handle so it
/// can drain a stale record without waiting on the consumer.
pub struct RecordPublisher {
    tx: cb::Sender<Record>,
    drain: cb::Receiver<Record>,
}

/// Create a connected publisher / receiver pair.
pub fn latest_slot() -> (RecordPublisher, RecordReceiver) {
    let (tx, rx) = cb::bounded(1);
    let publisher = RecordPublisher {
        tx,
        drain: rx.clone(),
    };
    (publisher, rx)
}

impl RecordPublisher {
    /// Place `record` in the slot, discarding whatever was there.
    pub fn publish(&self, record: Record) -> Published {
        let mut outcome = Published::Delivered;
        let mut pending = record;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return outcome,
                Err(cb::TrySendError::Full(back)) => {
                    // The consumer may win the race for the stale record;
                    // either way the next try_send finds room.
                    if self.drain.try_recv().is_ok() {
                        outcome = Published::ReplacedStale;
                    }
                    pending = back;
                }
                // Unreachable while `drain` is held; nothing to deliver to.
                Err(cb::TrySendError::Disconnected(_)) => return outcome,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: u64) -> Record {
        Record {
            samples: vec![tag as f64],
            trigger_index: 0,
            trigger_offset: 0.0,
            start_index: tag,
        }
    }

    #[test]
    fn delivers_into_empty_slot() {
        let (publisher, rx) = latest_slot();
        assert_eq!(publisher.publish(record(1)), Published::Delivered);
        assert_eq!(rx.len(), 1);
        assert_eq!(rx.try_recv().unwrap().start_index, 1);
        assert!(rx.is_empty());
    }

    #[test]
    fn overwrites_stale_record() {
        let (publisher, rx) = latest_slot();
        publisher.publish(record(1));
        assert_eq!(publisher.publish(record(2)), Published::ReplacedStale);
        assert_eq!(publisher.publish(record(3)), Published::ReplacedStale);

        assert_eq!(rx.try_recv().unwrap().start_index, 3);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_without_consumer_never_blocks() {
        let (publisher, rx) = latest_slot();
        drop(rx);
        for tag in 0..100 {
            publisher.publish(record(tag));
        }
        assert_eq!(publisher.drain.try_recv().unwrap().start_index, 99);
    }
}
