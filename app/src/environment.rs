//! Injected dependencies for the map-search feature.

use mapsearch_core::connectivity::ConnectivityService;
use mapsearch_core::environment::Clock;
use mapsearch_core::location::LocationService;
use mapsearch_core::search::{CompletionService, SearchService};
use mapsearch_core::weather::WeatherService;
use std::sync::Arc;
use std::time::Duration;

/// Service capabilities the reducer needs, behind trait objects so
/// production adapters and test doubles satisfy the same contracts.
#[derive(Clone)]
pub struct AppEnvironment {
    /// Search-as-you-type completer
    pub completions: Arc<dyn CompletionService>,
    /// Suggestion-to-places resolution
    pub search: Arc<dyn SearchService>,
    /// Authorization and device location
    pub location: Arc<dyn LocationService>,
    /// Network path monitoring
    pub connectivity: Arc<dyn ConnectivityService>,
    /// Weather lookup
    pub weather: Arc<dyn WeatherService>,
    /// Time source for stamping state updates
    pub clock: Arc<dyn Clock>,
    /// Quiet period between the viewport moving and the settled-region
    /// pipeline firing
    pub region_debounce: Duration,
}

impl AppEnvironment {
    /// Assemble an environment with the default one-second region
    /// debounce.
    #[must_use]
    pub fn new(
        completions: Arc<dyn CompletionService>,
        search: Arc<dyn SearchService>,
        location: Arc<dyn LocationService>,
        connectivity: Arc<dyn ConnectivityService>,
        weather: Arc<dyn WeatherService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            completions,
            search,
            location,
            connectivity,
            weather,
            clock,
            region_debounce: Duration::from_secs(1),
        }
    }

    /// Override the region debounce window (tests use a short one)
    #[must_use]
    pub fn with_region_debounce(mut self, region_debounce: Duration) -> Self {
        self.region_debounce = region_debounce;
        self
    }
}
