//! Runtime-agnostic async abstractions.
//!
//! The registry and the discovery pump only need a handful of primitives from
//! the executor: a timer-backed timeout for transport calls, an async mutex for
//! the record table, a monotonic clock and task spawning for the pump. This
//! module selects them from the runtime enabled by feature flag.
//!
//! # Feature Flags
//!
//! - `runtime-tokio` (default) - Use the tokio runtime
//! - `runtime-async-std` - Use the async-std runtime
//! - `runtime-smol` - Use the smol runtime
//!
//! # Example
//!
//! ```toml
//! [dependencies]
//! lifx-lan-bridge = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! ```

use std::future::Future;
use std::time::Duration;

#[cfg(feature = "runtime-tokio")]
mod tokio_impl;

#[cfg(feature = "runtime-async-std")]
mod async_std_impl;

#[cfg(feature = "runtime-smol")]
mod smol_impl;

#[cfg(feature = "runtime-tokio")]
use tokio_impl as imp;

#[cfg(feature = "runtime-async-std")]
use async_std_impl as imp;

#[cfg(feature = "runtime-smol")]
use smol_impl as imp;

pub use imp::JoinHandle;

/// Sleep for the specified duration.
pub async fn sleep(duration: Duration) {
    imp::sleep(duration).await
}

/// Run a future with a timeout.
///
/// Returns `Err(TimedOut)` if the timeout expires before the future completes.
pub async fn timeout<F, T>(duration: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    imp::timeout(duration, future).await
}

/// Spawn a future as a background task on the selected runtime.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    imp::spawn(future)
}

/// Error returned when a timeout expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

impl std::fmt::Display for TimedOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for TimedOut {}

/// A measurement of monotonically increasing time.
///
/// Backed by the runtime clock; used for the state cache TTL and the journal.
#[derive(Debug, Clone, Copy)]
pub struct Instant(imp::InstantInner);

impl Instant {
    /// Returns the current instant.
    pub fn now() -> Self {
        Instant(imp::InstantInner::now())
    }

    /// Returns the duration elapsed since this instant was created.
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

// Async mutex re-export
#[cfg(feature = "runtime-tokio")]
pub use tokio::sync::Mutex;

#[cfg(feature = "runtime-async-std")]
pub use async_std::sync::Mutex;

#[cfg(feature = "runtime-smol")]
pub use async_lock::Mutex;

#[cfg(not(any(
    feature = "runtime-tokio",
    feature = "runtime-async-std",
    feature = "runtime-smol"
)))]
compile_error!(
    "One of \"runtime-tokio\", \"runtime-async-std\", or \"runtime-smol\" features must be enabled"
);

#[cfg(any(
    all(feature = "runtime-tokio", feature = "runtime-async-std"),
    all(feature = "runtime-tokio", feature = "runtime-smol"),
    all(feature = "runtime-async-std", feature = "runtime-smol"),
))]
compile_error!("Only one runtime feature may be enabled at a time");
