//! Network reachability boundary.
//!
//! A thin wrapper over a platform path monitor: one infinite stream of
//! reachability states, already debounced by the implementation so the
//! consumer is not flooded during interface flaps.

use futures::stream::BoxStream;

/// Reachability of the network path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityStatus {
    /// The path is usable
    Satisfied,
    /// The path is not usable
    Unsatisfied,
    /// The path could become usable if a connection is established
    /// (e.g. VPN not yet up)
    RequiresConnection,
}

impl ConnectivityStatus {
    /// Whether network traffic can be sent right now
    #[must_use]
    pub const fn is_satisfied(self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Network path monitoring capability.
pub trait ConnectivityService: Send + Sync {
    /// Subscribe to reachability updates.
    ///
    /// Infinite; ends only when the subscription is cancelled.
    fn monitor_path(&self) -> BoxStream<'static, ConnectivityStatus>;
}
