//! Random number generator abstraction for determinism.
//!
//! In production this wraps a real RNG. The simulated payment gateway
//! rolls against it to decide approval, so tests inject a scripted
//! implementation instead.

use rand::Rng;

/// Abstraction over random number generation.
///
/// Methods take `&mut self` because RNG is inherently stateful. Concrete
/// implementations shared across threads must use interior mutability
/// (e.g., `Mutex<SeedableRng>`) to satisfy the `Send + Sync` bounds.
pub trait DeterministicRng: Send + Sync + std::fmt::Debug {
    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;
}

/// Production RNG backed by the thread-local random number generator.
#[derive(Debug)]
pub struct StdRng;

impl DeterministicRng for StdRng {
    fn next_f64(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}
