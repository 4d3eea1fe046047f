// Input Filter Matcher Registry
// Ordered capture rules, evaluated first-match-wins

mod capture;
mod control;

pub use capture::KeyCaptureMatcher;
pub use control::{CapturedKeySet, Control};

use crate::event::RawEvent;

/// Outcome of offering an event to a matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The matcher handled the event; it must not reach the virtual device.
    Consumed,
    /// The matcher ignored the event.
    Passed,
}

impl Verdict {
    pub fn is_consumed(self) -> bool {
        self == Verdict::Consumed
    }
}

/// A capture rule: classification plus whatever side effect goes with it
pub trait Matcher {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Inspect `event` and decide whether to consume it.
    ///
    /// Side effects happen only when returning [`Verdict::Consumed`].
    fn try_consume(&self, event: &RawEvent) -> Verdict;
}

/// Matchers in registration order
///
/// The first matcher that consumes an event ends evaluation for it.
/// Overlapping matchers are allowed; the earlier registration wins.
#[derive(Default)]
pub struct MatcherRegistry {
    matchers: Vec<Box<dyn Matcher>>,
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, matcher: Box<dyn Matcher>) {
        log::debug!("Registered matcher '{}' at position {}", matcher.name(), self.matchers.len());
        self.matchers.push(matcher);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, matcher: impl Matcher + 'static) -> Self {
        self.register(Box::new(matcher));
        self
    }

    /// Offer `event` to each matcher in order, stopping at the first consumer.
    ///
    /// Returns the index of the matcher that consumed the event.
    pub fn first_consumer(&self, event: &RawEvent) -> Option<usize> {
        self.matchers
            .iter()
            .position(|matcher| matcher.try_consume(event).is_consumed())
    }

    pub fn offer(&self, event: &RawEvent) -> Verdict {
        match self.first_consumer(event) {
            Some(_) => Verdict::Consumed,
            None => Verdict::Passed,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl std::fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("matchers", &self.names())
            .finish()
    }
}
