//! Reducer logic for the map-search feature.
//!
//! All business logic lives here: query changes, completion selection,
//! region settling, the location-permission state machine, connectivity
//! changes, and weather responses. The reducer is synchronous; every
//! suspension point lives inside the effects it returns.

use crate::environment::AppEnvironment;
use crate::types::{Alert, AppAction, AppState};
use futures::StreamExt;
use mapsearch_core::effect::Effect;
use mapsearch_core::geo::{Region, Span};
use mapsearch_core::location::{AuthorizationStatus, LocationEvent};
use mapsearch_core::reducer::Reducer;
use mapsearch_core::{SmallVec, smallvec};
use std::sync::Arc;

/// Cancellation keys for the feature's effects.
///
/// Long-lived subscriptions register once under their key at
/// `OnAppear`; ad-hoc requests are cancelled-and-replaced under theirs
/// so only the most recent request's result can reach state.
pub mod effect_ids {
    /// Location delegate subscription (lives for the app's lifetime)
    pub const LOCATION_MANAGER: &str = "location-manager";
    /// Network path subscription (lives for the app's lifetime)
    pub const NETWORK_PATH: &str = "network-path";
    /// Completion stream subscription (lives for the app's lifetime)
    pub const COMPLETIONS: &str = "search-completions";
    /// Debounced settled-region pipeline
    pub const REGION_DEBOUNCE: &str = "region-debounce";
    /// In-flight weather lookup
    pub const WEATHER_REQUEST: &str = "weather-request";
    /// In-flight place resolution
    pub const PLACE_SEARCH: &str = "place-search";
}

/// Reducer for the map-search feature
#[derive(Clone, Debug, Default)]
pub struct AppReducer;

impl AppReducer {
    /// Creates a new `AppReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Location delegate events: the `requesting → idle` half of the
    /// permission state machine.
    fn reduce_location_event(
        state: &mut AppState,
        event: LocationEvent,
        env: &AppEnvironment,
    ) -> SmallVec<[Effect<AppAction>; 4]> {
        match event {
            LocationEvent::AuthorizationChanged(status) if status.is_authorized() => {
                if state.is_requesting_current_location {
                    let location = Arc::clone(&env.location);
                    smallvec![Effect::Future(Box::pin(async move {
                        location.request_location().await;
                        None
                    }))]
                } else {
                    smallvec![Effect::None]
                }
            },
            LocationEvent::AuthorizationChanged(AuthorizationStatus::Denied) => {
                if state.is_requesting_current_location {
                    state.alert = Some(Alert::new(
                        "Location makes this app better. Please consider giving us access.",
                    ));
                    state.is_requesting_current_location = false;
                }
                smallvec![Effect::None]
            },
            LocationEvent::AuthorizationChanged(_) => smallvec![Effect::None],
            LocationEvent::LocationsUpdated(locations) => {
                state.is_requesting_current_location = false;
                if let Some(location) = locations.first() {
                    state.region = Region::new(*location, Span::new(0.05, 0.05));
                }
                smallvec![Effect::None]
            },
        }
    }
}

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = AppEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::OnAppear => {
                // Long-lived subscriptions, one per stable key. Keyed
                // with cancel_in_flight so a repeated OnAppear swaps the
                // subscription instead of leaking a second one.
                let completions = Effect::Stream(Box::pin(
                    env.completions
                        .completions()
                        .map(AppAction::CompletionsUpdated),
                ))
                .cancellable(effect_ids::COMPLETIONS, true);

                let delegate = Effect::Stream(Box::pin(
                    env.location
                        .delegate_events()
                        .map(AppAction::LocationManager),
                ))
                .cancellable(effect_ids::LOCATION_MANAGER, true);

                let path = Effect::Stream(Box::pin(
                    env.connectivity.monitor_path().map(AppAction::PathUpdated),
                ))
                .cancellable(effect_ids::NETWORK_PATH, true);

                smallvec![Effect::merge(vec![completions, delegate, path])]
            },

            AppAction::QueryChanged(query) => {
                state.query.clone_from(&query);
                let completions = Arc::clone(&env.completions);
                smallvec![Effect::Future(Box::pin(async move {
                    completions.set_query(query).await;
                    None
                }))]
            },

            AppAction::CompletionsUpdated(Ok(completions)) => {
                state.completions = completions;
                smallvec![Effect::None]
            },
            AppAction::CompletionsUpdated(Err(error)) => {
                tracing::warn!(error = %error, "Completion stream reported an error");
                smallvec![Effect::None]
            },

            AppAction::TappedCompletion(completion) => {
                state.query.clone_from(&completion.title);
                let search = Arc::clone(&env.search);
                smallvec![
                    Effect::Future(Box::pin(async move {
                        Some(AppAction::SearchResponse(search.resolve(completion).await))
                    }))
                    .cancellable(effect_ids::PLACE_SEARCH, true)
                ]
            },

            AppAction::SearchResponse(Ok(response)) => {
                state.region = response.bounding_region;
                state.map_items = response.places;
                smallvec![Effect::None]
            },
            AppAction::SearchResponse(Err(error)) => {
                tracing::warn!(error = %error, "Place resolution failed");
                smallvec![Effect::None]
            },

            AppAction::RegionWillChange(region) => {
                // Panning emits a burst of these; only the settled
                // region survives the quiet period.
                smallvec![
                    Effect::Future(Box::pin(async move {
                        Some(AppAction::RegionChanged(region))
                    }))
                    .debounce(effect_ids::REGION_DEBOUNCE, env.region_debounce)
                ]
            },

            AppAction::RegionChanged(region) => {
                state.region = region;
                // Supersede any in-flight lookup; a stale reading must
                // never land after a newer request begins.
                let weather = Arc::clone(&env.weather);
                smallvec![
                    Effect::Future(Box::pin(async move {
                        Some(AppAction::WeatherResponse(weather.fetch(region).await))
                    }))
                    .cancellable(effect_ids::WEATHER_REQUEST, true)
                ]
            },

            AppAction::WeatherResponse(Ok(reading)) => {
                state.weather = Some(reading);
                state.weather_updated_at = Some(env.clock.now());
                smallvec![Effect::None]
            },
            AppAction::WeatherResponse(Err(error)) => {
                tracing::warn!(error = %error, "Weather lookup failed");
                smallvec![Effect::None]
            },

            AppAction::PathUpdated(status) => {
                state.connectivity = status;
                smallvec![Effect::None]
            },

            AppAction::CurrentLocationButtonTapped => {
                if !state.connectivity.is_satisfied() {
                    state.alert = Some(Alert::new("Not connected to the internet."));
                    return smallvec![Effect::None];
                }
                if !env.location.location_services_enabled() {
                    state.alert = Some(Alert::new("Location services are turned off."));
                    return smallvec![Effect::None];
                }

                match env.location.authorization_status() {
                    AuthorizationStatus::NotDetermined => {
                        state.is_requesting_current_location = true;
                        let location = Arc::clone(&env.location);
                        smallvec![Effect::Future(Box::pin(async move {
                            location.request_when_in_use_authorization().await;
                            None
                        }))]
                    },
                    AuthorizationStatus::Restricted | AuthorizationStatus::Denied => {
                        state.alert = Some(Alert::new(
                            "Please give us access to your location in settings.",
                        ));
                        smallvec![Effect::None]
                    },
                    AuthorizationStatus::AuthorizedAlways
                    | AuthorizationStatus::AuthorizedWhenInUse => {
                        let location = Arc::clone(&env.location);
                        smallvec![Effect::Future(Box::pin(async move {
                            location.request_location().await;
                            None
                        }))]
                    },
                }
            },

            AppAction::LocationManager(event) => Self::reduce_location_event(state, event, env),

            AppAction::DismissAlertButtonTapped => {
                state.alert = None;
                smallvec![Effect::None]
            },

            AppAction::ToggleNavigationBar => {
                state.navigation_bar_hidden = !state.navigation_bar_hidden;
                smallvec![Effect::None]
            },
            AppAction::ShowUiButtons => {
                state.ui_buttons_hidden = false;
                smallvec![Effect::None]
            },
            AppAction::HideUiButtons => {
                state.ui_buttons_hidden = true;
                smallvec![Effect::None]
            },
        }
    }
}
