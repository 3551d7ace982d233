//! Shared provider traits for dependency injection.
//!
//! External inputs that make behavior nondeterministic sit behind small
//! traits so modules can be tested with fixed values.

use chrono::{DateTime, Local};

/// Trait for providing timestamps.
///
/// History entries are stamped through this trait, which lets tests pin
/// the clock.
///
/// # Example
///
/// ```
/// use natsh::providers::{TimeProvider, SystemTimeProvider};
///
/// let provider = SystemTimeProvider;
/// let now = provider.now();
/// assert!(now.timestamp() > 0);
/// ```
pub trait TimeProvider: Send + Sync {
    /// Returns the current local time.
    fn now(&self) -> DateTime<Local>;
}

/// Default time provider using the system clock.
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
