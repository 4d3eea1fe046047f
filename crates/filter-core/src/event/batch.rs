// Input Filter Batch Processing
// Read and write events in batches, one syscall each way

use smallvec::SmallVec;

/// Events retained from one read, in read order
///
/// The inline capacity matches the read buffer, so filtering a full
/// read never touches the heap.
#[derive(Debug, Clone)]
pub struct EventBatch<T> {
    events: SmallVec<[T; batch_config::READ_BATCH]>,
}

impl<T> EventBatch<T> {
    /// Create a new empty batch
    pub fn new() -> Self {
        Self {
            events: SmallVec::new(),
        }
    }

    /// Add an event to the batch
    pub fn push(&mut self, event: T) {
        self.events.push(event);
    }

    /// Extend the batch with multiple events
    pub fn extend(&mut self, events: impl IntoIterator<Item = T>) {
        self.events.extend(events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.events
    }

    /// Consume the batch and return the events
    pub fn into_vec(self) -> Vec<T> {
        self.events.into_vec()
    }
}

impl<T> Default for EventBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AsRef<[T]> for EventBatch<T> {
    fn as_ref(&self) -> &[T] {
        &self.events
    }
}

/// Batch size configuration
pub mod batch_config {
    /// Records requested from the source device per read
    pub const READ_BATCH: usize = 64;

    /// Poll timeout used between shutdown checks
    pub const POLL_TIMEOUT_MS: i32 = 100;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_batch_new() {
        let batch: EventBatch<u32> = EventBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn test_event_batch_keeps_order() {
        let mut batch = EventBatch::new();
        batch.push(3);
        batch.extend(vec![1, 2]);
        assert_eq!(batch.as_slice(), &[3, 1, 2]);
    }

    #[test]
    fn test_event_batch_clear() {
        let mut batch = EventBatch::new();
        batch.extend(vec![1, 2]);
        batch.clear();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_event_batch_spills_past_inline_capacity() {
        let mut batch = EventBatch::new();
        batch.extend(0..(batch_config::READ_BATCH as u32 + 5));
        assert_eq!(batch.len(), batch_config::READ_BATCH + 5);
        let sum: u32 = batch.iter().take(3).sum();
        assert_eq!(sum, 3);
        assert_eq!(batch.into_vec().last(), Some(&68));
    }
}
