//! # Mapsearch Testing
//!
//! Testing utilities and helpers for the mapsearch architecture.
//!
//! This crate provides:
//! - Deterministic doubles for every service boundary the application
//!   core depends on
//! - A fixed clock for reproducible time
//! - A fluent [`ReducerTest`] harness with Given-When-Then syntax
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use mapsearch_testing::fakes::ScriptedCompletionService;
//! use mapsearch_runtime::Store;
//!
//! #[tokio::test]
//! async fn completions_reach_state() {
//!     let completer = ScriptedCompletionService::new();
//!     let store = Store::new(AppState::default(), AppReducer::new(), env(&completer));
//!
//!     store.send(AppAction::OnAppear).await?;
//!     completer.send(Ok(vec![candidate.clone()]));
//!
//!     // ...assert on store.state(...)
//! }
//! ```

use chrono::{DateTime, Utc};
use mapsearch_core::environment::Clock;

pub mod fakes;
mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of cross-cutting environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use mapsearch_testing::mocks::FixedClock;
    /// use mapsearch_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to
    /// parse, which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
