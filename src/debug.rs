//! Declick diagnostics from the audio thread.
//!
//! The block declicker records one [`DiagEvent`] per analysed window that
//! repaired something. Events travel through a fixed-capacity `ringbuf`
//! queue: pushing never allocates or blocks, and a full queue drops the
//! event and counts it. The editor drains the queue on a timer and forwards
//! each event to the `log` facade.

use ringbuf::{Consumer, Producer, RingBuffer};
use std::fmt;

/// Queue depth used by the plugin
pub const JOURNAL_CAPACITY: usize = 256;

/// Repairs made in one declick window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagEvent {
    /// 0 = left, 1 = right
    pub channel: u8,
    /// Index of the analysed window on that channel
    pub window: u64,
    pub clicks: u32,
    pub avg_spike_length: f32,
    pub avg_ratio_db: f32,
}

impl fmt::Display for DiagEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ch{} window {}: {} clicks, {:.1} smp, {:.1} dB",
            self.channel, self.window, self.clicks, self.avg_spike_length, self.avg_ratio_db
        )
    }
}

/// Audio-thread end.
pub struct DiagJournal {
    producer: Producer<DiagEvent>,
    dropped: u64,
}

impl DiagJournal {
    #[inline]
    pub fn record(&mut self, event: DiagEvent) {
        if self.producer.push(event).is_err() {
            self.dropped += 1;
        }
    }

    /// Events lost to a full queue since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Reader end, owned by the editor.
pub struct DiagReader {
    consumer: Consumer<DiagEvent>,
}

impl DiagReader {
    /// Hand every queued event to `f`; returns how many were taken.
    pub fn drain(&mut self, mut f: impl FnMut(DiagEvent)) -> usize {
        let mut taken = 0;
        while let Some(event) = self.consumer.pop() {
            f(event);
            taken += 1;
        }
        taken
    }

    pub fn drain_to_log(&mut self) -> usize {
        self.drain(|event| log::debug!("declick {}", event))
    }
}

pub fn journal(capacity: usize) -> (DiagJournal, DiagReader) {
    let (producer, consumer) = RingBuffer::<DiagEvent>::new(capacity.max(1)).split();
    (
        DiagJournal {
            producer,
            dropped: 0,
        },
        DiagReader { consumer },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(window: u64) -> DiagEvent {
        DiagEvent {
            channel: 1,
            window,
            clicks: 2,
            avg_spike_length: 6.0,
            avg_ratio_db: 18.3,
        }
    }

    #[test]
    fn test_events_arrive_in_order() {
        let (mut journal, mut reader) = journal(8);
        for w in 0..3 {
            journal.record(event(w));
        }
        let mut windows = Vec::new();
        assert_eq!(reader.drain(|e| windows.push(e.window)), 3);
        assert_eq!(windows, vec![0, 1, 2]);
        assert_eq!(reader.drain(|_| {}), 0);
    }

    #[test]
    fn test_full_queue_counts_drops() {
        let (mut journal, mut reader) = journal(4);
        for w in 0..10 {
            journal.record(event(w));
        }
        assert_eq!(journal.dropped(), 6);
        assert_eq!(reader.drain_to_log(), 4);
    }

    #[test]
    fn test_display_names_the_window() {
        assert_eq!(
            event(7).to_string(),
            "ch1 window 7: 2 clicks, 6.0 smp, 18.3 dB"
        );
    }
}
