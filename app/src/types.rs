//! Domain types for the map-search feature.
//!
//! One aggregate state, one closed action sum. The state is owned
//! exclusively by the store; the presentation layer reads snapshots and
//! dispatches actions, nothing else.

use chrono::{DateTime, Utc};
use mapsearch_core::connectivity::ConnectivityStatus;
use mapsearch_core::geo::Region;
use mapsearch_core::location::LocationEvent;
use mapsearch_core::search::{CompletionCandidate, ResolvedPlace, SearchError, SearchResponse};
use mapsearch_core::weather::{WeatherError, WeatherReading};

/// A pending user-facing alert.
///
/// At most one alert is pending at a time; it is cleared only by an
/// explicit [`AppAction::DismissAlertButtonTapped`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    /// Message shown to the user
    pub title: String,
}

impl Alert {
    /// Create an alert with the given title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// State of the map-search feature.
///
/// Created once at application start with defaults and alive for the
/// process duration; there is no persistence layer.
#[derive(Clone, Debug, PartialEq)]
pub struct AppState {
    /// Current search suggestions, ranking order
    pub completions: Vec<CompletionCandidate>,
    /// Search results shown on the map, provider order
    pub map_items: Vec<ResolvedPlace>,
    /// Current search text
    pub query: String,
    /// Current map viewport
    pub region: Region,

    /// Presentation flag: navigation bar hidden
    pub navigation_bar_hidden: bool,
    /// Presentation flag: floating action buttons hidden
    pub ui_buttons_hidden: bool,

    /// Last known network reachability
    pub connectivity: ConnectivityStatus,
    /// Last fetched weather reading, lagging the settled region by the
    /// debounce window
    pub weather: Option<WeatherReading>,
    /// When the current `weather` value was committed
    pub weather_updated_at: Option<DateTime<Utc>>,

    /// A "use my location" request is waiting on the authorization
    /// prompt; disambiguates the permission callback
    pub is_requesting_current_location: bool,
    /// Pending user-facing alert, if any
    pub alert: Option<Alert>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            completions: Vec::new(),
            map_items: Vec::new(),
            query: String::new(),
            region: Region::mock(),
            navigation_bar_hidden: false,
            ui_buttons_hidden: false,
            // Treat the network as reachable until the path monitor
            // reports otherwise
            connectivity: ConnectivityStatus::Satisfied,
            weather: None,
            weather_updated_at: None,
            is_requesting_current_location: false,
            alert: None,
        }
    }
}

impl AppState {
    /// Create the initial state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Everything that can happen to the map-search feature.
///
/// User input, service callbacks, and timer expirations all arrive
/// through this one closed sum, dispatched via exhaustive matching.
#[derive(Clone, Debug, PartialEq)]
pub enum AppAction {
    /// The feature became visible; subscribe the long-lived streams
    OnAppear,
    /// The search text changed
    QueryChanged(String),
    /// The completion stream produced a batch (or failed)
    CompletionsUpdated(Result<Vec<CompletionCandidate>, SearchError>),
    /// The user picked a suggestion
    TappedCompletion(CompletionCandidate),
    /// Place resolution finished
    SearchResponse(Result<SearchResponse, SearchError>),

    /// The user is panning; the settled region arrives via the debounced
    /// [`AppAction::RegionChanged`]
    RegionWillChange(Region),
    /// The viewport settled on a region
    RegionChanged(Region),
    /// Weather lookup finished
    WeatherResponse(Result<WeatherReading, WeatherError>),

    /// The network path monitor reported a reachability change
    PathUpdated(ConnectivityStatus),

    /// The location delegate emitted an event
    LocationManager(LocationEvent),
    /// The user tapped the "use my location" button
    CurrentLocationButtonTapped,

    /// The user dismissed the pending alert
    DismissAlertButtonTapped,
    /// The user toggled the chrome-less map view
    ToggleNavigationBar,
    /// Show the floating action buttons
    ShowUiButtons,
    /// Hide the floating action buttons
    HideUiButtons,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapsearch_core::geo::{Coordinate, Span};

    #[test]
    fn initial_state_uses_mock_region() {
        let state = AppState::new();

        assert_eq!(state.region, Region::mock());
        assert_eq!(
            state.region.center,
            Coordinate::new(40.7, -74.0)
        );
        assert_eq!(state.region.span, Span::new(0.075, 0.075));
        assert!(state.completions.is_empty());
        assert!(state.map_items.is_empty());
        assert!(state.query.is_empty());
        assert!(state.alert.is_none());
        assert!(state.weather.is_none());
        assert!(!state.is_requesting_current_location);
    }

    #[test]
    fn alert_title() {
        let alert = Alert::new("Location services are turned off.");
        assert_eq!(alert.title, "Location services are turned off.");
    }
}
