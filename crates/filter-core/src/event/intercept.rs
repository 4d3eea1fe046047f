// Input Filter Interceptor
// Applies the matcher registry to a batch under the current mode

use super::batch::EventBatch;
use super::raw::RawEvent;
use crate::matcher::MatcherRegistry;
use crate::mode::InterceptMode;

/// Counts for one filtered batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub read: usize,
    pub consumed: usize,
    /// Mode the whole batch was processed under
    pub intercepting: bool,
}

/// Owns the matcher registry and shares the mode cell with the controller
#[derive(Debug)]
pub struct Interceptor {
    registry: MatcherRegistry,
    mode: InterceptMode,
}

impl Interceptor {
    pub fn new(registry: MatcherRegistry, mode: InterceptMode) -> Self {
        Self { registry, mode }
    }

    pub fn mode(&self) -> &InterceptMode {
        &self.mode
    }

    pub fn registry(&self) -> &MatcherRegistry {
        &self.registry
    }

    /// Append the events of `batch` that nobody consumed to `retained`.
    ///
    /// The mode is sampled once, before the first event, so a toggle that
    /// lands mid-batch only affects later batches.
    pub fn filter_batch(&self, batch: &[RawEvent], retained: &mut EventBatch<RawEvent>) -> BatchOutcome {
        let intercepting = self.mode.is_enabled();
        let mut outcome = BatchOutcome {
            read: batch.len(),
            consumed: 0,
            intercepting,
        };

        if !intercepting {
            retained.extend(batch.iter().copied());
            return outcome;
        }

        for event in batch {
            if self.registry.offer(event).is_consumed() {
                outcome.consumed += 1;
            } else {
                retained.push(*event);
            }
        }
        outcome
    }
}
