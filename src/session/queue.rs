//! Pending transcript queue
//!
//! Hand-off between the recognizer (producer, audio thread) and the main
//! interaction loop (sole consumer).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::log::Utterance;

/// Thread-safe FIFO of recognized utterances
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct TranscriptQueue {
    inner: Arc<Mutex<VecDeque<Utterance>>>,
}

impl TranscriptQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere must not strand queued utterances
    fn lock(&self) -> MutexGuard<'_, VecDeque<Utterance>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue an utterance
    pub fn push(&self, utterance: Utterance) {
        let mut queue = self.lock();
        queue.push_back(utterance);
        tracing::trace!(pending = queue.len(), "utterance queued");
    }

    /// Take every queued utterance in arrival order
    ///
    /// Pushes racing with a drain land either in this batch or the next.
    #[must_use]
    pub fn drain(&self) -> Vec<Utterance> {
        let batch = std::mem::take(&mut *self.lock());
        Vec::from(batch)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utt(s: &str) -> Utterance {
        Utterance::new(s).unwrap()
    }

    #[test]
    fn drain_preserves_order_and_empties() {
        let queue = TranscriptQueue::new();
        queue.push(utt("one"));
        queue.push(utt("two"));
        queue.push(utt("three"));

        let drained = queue.drain();
        let texts: Vec<&str> = drained.iter().map(Utterance::as_str).collect();
        assert_eq!(texts, ["one", "two", "three"]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn clones_share_storage() {
        let producer = TranscriptQueue::new();
        let consumer = producer.clone();
        producer.push(utt("hello"));
        assert_eq!(consumer.len(), 1);
        assert_eq!(consumer.drain()[0].as_str(), "hello");
        assert!(producer.is_empty());
    }
}
