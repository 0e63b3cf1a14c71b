//! Device location boundary.
//!
//! Mirrors the shape of a platform location manager: synchronous
//! authorization queries, fire-and-forget requests, and a delegate-style
//! event stream that reports authorization changes and position fixes.
//!
//! # Dyn Compatibility
//!
//! Uses explicit `Pin<Box<dyn Future>>` / boxed stream returns instead
//! of `async fn` to enable trait object usage (`Arc<dyn LocationService>`).

use crate::geo::Coordinate;
use futures::stream::BoxStream;
use std::future::Future;
use std::pin::Pin;

/// Authorization state of the location capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet
    NotDetermined,
    /// Location access is restricted by policy (parental controls, MDM)
    Restricted,
    /// The user explicitly denied access
    Denied,
    /// Access granted at all times
    AuthorizedAlways,
    /// Access granted while the app is in use
    AuthorizedWhenInUse,
}

impl AuthorizationStatus {
    /// Whether this status allows requesting the device location
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::AuthorizedAlways | Self::AuthorizedWhenInUse)
    }
}

/// Events emitted by the location delegate stream.
#[derive(Clone, Debug, PartialEq)]
pub enum LocationEvent {
    /// The authorization status changed (prompt answered, settings edit)
    AuthorizationChanged(AuthorizationStatus),
    /// One or more position fixes arrived, most recent last
    LocationsUpdated(Vec<Coordinate>),
}

/// Device location capability.
pub trait LocationService: Send + Sync {
    /// Current authorization status, queried synchronously
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Whether location services are enabled device-wide
    fn location_services_enabled(&self) -> bool;

    /// Prompt the user for when-in-use authorization.
    ///
    /// Fire-and-forget: the outcome arrives as an
    /// [`LocationEvent::AuthorizationChanged`] on the delegate stream.
    fn request_when_in_use_authorization(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Request a one-shot position fix.
    ///
    /// Fire-and-forget: the fix arrives as an
    /// [`LocationEvent::LocationsUpdated`] on the delegate stream.
    fn request_location(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Subscribe to delegate events.
    ///
    /// Infinite; ends only when the subscription is cancelled.
    fn delegate_events(&self) -> BoxStream<'static, LocationEvent>;
}
