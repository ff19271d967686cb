//! Exponential-backoff value generator with a ceiling.
//!
//! Shared by every retried operation: each retry sequence creates a fresh
//! [`Backoff`] so delays never carry over between unrelated operations.

/// Stateful exponential-backoff generator.
///
/// Preconditions callers must satisfy: `initial > 0`, `multiplier > 1`,
/// `maximum >= initial`. Under those, [`decay`](Backoff::decay) never
/// returns a negative or NaN value.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: f64,
    multiplier: f64,
    maximum: f64,
    current: f64,
}

impl Backoff {
    /// Creates a backoff generator ready to yield `initial` on the first
    /// call to [`decay`](Backoff::decay).
    pub fn new(initial: f64, multiplier: f64, maximum: f64) -> Self {
        let mut backoff = Self {
            initial,
            multiplier,
            maximum,
            current: 0.0,
        };
        backoff.reset();
        backoff
    }

    /// Rewinds the generator to the start of a fresh retry sequence.
    ///
    /// The first `decay()` call multiplies, so seed with `initial /
    /// multiplier` to make that call yield exactly `initial`.
    pub fn reset(&mut self) {
        self.current = self.initial / self.multiplier;
    }

    /// Advances the generator and returns the next delay in seconds.
    pub fn decay(&mut self) -> f64 {
        self.current = (self.current * self.multiplier).min(self.maximum);
        self.current
    }
}
