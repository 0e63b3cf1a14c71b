//! Integration tests driving the full feature through the store.
//!
//! Unlike the reducer unit tests, these exercise the real feedback loop:
//! scripted services push values into live stream subscriptions, effects
//! race against keyed cancellation, and debounce timers actually elapse.

#![allow(clippy::unwrap_used)] // Test code can unwrap

use mapsearch_app::{AppAction, AppEnvironment, AppReducer, AppState};
use mapsearch_core::connectivity::ConnectivityStatus;
use mapsearch_core::geo::{Coordinate, Region, Span};
use mapsearch_core::location::{AuthorizationStatus, LocationEvent};
use mapsearch_core::search::{
    CompletionCandidate, ResolvedPlace, SearchError, SearchResponse,
};
use mapsearch_core::weather::WeatherReading;
use mapsearch_runtime::Store;
use mapsearch_testing::fakes::{
    ControlledLocationService, ScriptedCompletionService, ScriptedConnectivityService,
    StubSearchService, StubWeatherService,
};
use mapsearch_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    completer: Arc<ScriptedCompletionService>,
    search: Arc<StubSearchService>,
    location: Arc<ControlledLocationService>,
    connectivity: Arc<ScriptedConnectivityService>,
    weather: Arc<StubWeatherService>,
    store: Store<AppState, AppAction, AppEnvironment, AppReducer>,
}

fn fixture(region_debounce: Duration) -> Fixture {
    let completer = Arc::new(ScriptedCompletionService::new());
    let search = Arc::new(StubSearchService::failing());
    let location = Arc::new(ControlledLocationService::new());
    let connectivity = Arc::new(ScriptedConnectivityService::new());
    let weather = Arc::new(StubWeatherService::failing());

    let env = AppEnvironment::new(
        Arc::clone(&completer) as _,
        Arc::clone(&search) as _,
        Arc::clone(&location) as _,
        Arc::clone(&connectivity) as _,
        Arc::clone(&weather) as _,
        Arc::new(test_clock()),
    )
    .with_region_debounce(region_debounce);

    let store = Store::new(AppState::default(), AppReducer::new(), env);

    Fixture {
        completer,
        search,
        location,
        connectivity,
        weather,
        store,
    }
}

fn candidate() -> CompletionCandidate {
    CompletionCandidate::new("Apple Store", "Search Nearby")
}

#[tokio::test]
async fn appear_query_tap_scenario() {
    let f = fixture(Duration::from_millis(50));
    f.search.respond_with(SearchResponse {
        bounding_region: Region::new(Coordinate::new(0.0, 0.0), Span::new(1.0, 1.0)),
        places: vec![ResolvedPlace::new(Coordinate::new(0.0, 0.0), "Apple Store")],
    });

    // Appear subscribes the completion stream; a pushed batch reaches state
    f.store.send(AppAction::OnAppear).await.unwrap();
    f.completer.send(Ok(vec![candidate()]));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        f.store.state(|s| s.completions.clone()).await,
        vec![candidate()]
    );

    // Typing updates the query and notifies the completer
    f.store
        .send(AppAction::QueryChanged("Apple".to_string()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(f.store.state(|s| s.query.clone()).await, "Apple");
    assert_eq!(f.completer.queries(), vec!["Apple"]);

    // Picking the suggestion adopts its title and resolves to places
    f.store
        .send(AppAction::TappedCompletion(candidate()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (query, region, items) = f
        .store
        .state(|s| (s.query.clone(), s.region, s.map_items.clone()))
        .await;
    assert_eq!(query, "Apple Store");
    assert_eq!(region, Region::new(Coordinate::new(0.0, 0.0), Span::new(1.0, 1.0)));
    assert_eq!(
        items,
        vec![ResolvedPlace::new(Coordinate::new(0.0, 0.0), "Apple Store")]
    );
}

#[tokio::test]
async fn panning_burst_settles_on_last_region_with_one_weather_fetch() {
    let f = fixture(Duration::from_millis(80));
    f.weather.respond_with(WeatherReading {
        temp: Some(284.0),
        humidity: Some(70.0),
    });

    let r1 = Region::new(Coordinate::new(10.0, 10.0), Span::new(0.1, 0.1));
    let r2 = Region::new(Coordinate::new(20.0, 20.0), Span::new(0.1, 0.1));

    f.store.send(AppAction::RegionWillChange(r1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    f.store.send(AppAction::RegionWillChange(r2)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;

    // Only the settled region survives the quiet period; r1 is discarded
    assert_eq!(f.store.state(|s| s.region).await, r2);
    assert_eq!(f.weather.fetches(), vec![r2]);
    assert_eq!(
        f.store.state(|s| s.weather).await,
        Some(WeatherReading {
            temp: Some(284.0),
            humidity: Some(70.0),
        })
    );
}

#[tokio::test]
async fn superseded_weather_fetch_never_lands() {
    let f = fixture(Duration::from_millis(10));
    let stale = WeatherReading {
        temp: Some(250.0),
        humidity: Some(10.0),
    };
    let fresh = WeatherReading {
        temp: Some(290.0),
        humidity: Some(80.0),
    };
    // First fetch answers slowly, second immediately
    f.weather.enqueue(Duration::from_millis(100), Ok(stale));
    f.weather.enqueue(Duration::ZERO, Ok(fresh));

    let region_a = Region::new(Coordinate::new(1.0, 1.0), Span::new(0.1, 0.1));
    let region_b = Region::new(Coordinate::new(2.0, 2.0), Span::new(0.1, 0.1));

    f.store.send(AppAction::RegionChanged(region_a)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    f.store.send(AppAction::RegionChanged(region_b)).await.unwrap();

    // Both fetches have started; let the stale timer run out too
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(f.weather.fetches(), vec![region_a, region_b]);
    assert_eq!(f.store.state(|s| s.weather).await, Some(fresh));
}

#[tokio::test]
async fn superseded_place_search_never_lands() {
    let f = fixture(Duration::from_millis(10));
    // Resolution is slow; a second tap supersedes the first in-flight one
    f.search.set_latency(Duration::from_millis(60));
    f.search.respond_with(SearchResponse {
        bounding_region: Region::new(Coordinate::new(5.0, 5.0), Span::new(0.5, 0.5)),
        places: vec![ResolvedPlace::new(Coordinate::new(5.0, 5.0), "Apple Store")],
    });

    let first = CompletionCandidate::new("Apple Store", "Search Nearby");
    let second = CompletionCandidate::new("Apple Park", "Cupertino");

    let mut actions = f.store.subscribe_actions();

    f.store
        .send(AppAction::TappedCompletion(first.clone()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    f.store
        .send(AppAction::TappedCompletion(second.clone()))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    // Both resolutions started, but the first was cancelled in flight:
    // exactly one response fed back into the store
    assert_eq!(f.search.resolved(), vec![first, second]);

    let mut responses = 0;
    while let Ok(Ok(action)) =
        tokio::time::timeout(Duration::from_millis(50), actions.recv()).await
    {
        if matches!(action, AppAction::SearchResponse(_)) {
            responses += 1;
        }
    }
    assert_eq!(responses, 1);
    assert_eq!(f.store.state(|s| s.query.clone()).await, "Apple Park");
    assert_eq!(f.store.state(|s| s.map_items.len()).await, 1);
}

#[tokio::test]
async fn completion_stream_error_does_not_stop_the_stream() {
    let f = fixture(Duration::from_millis(10));

    f.store.send(AppAction::OnAppear).await.unwrap();

    // An in-band error degrades to an ignored action...
    f.completer
        .send(Err(SearchError::Service("completer offline".to_string())));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(f.store.state(|s| s.completions.is_empty()).await);
    assert!(f.store.state(|s| s.alert.is_none()).await);

    // ...and the subscription keeps delivering subsequent batches
    f.completer.send(Ok(vec![candidate()]));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(
        f.store.state(|s| s.completions.clone()).await,
        vec![candidate()]
    );
}

#[tokio::test]
async fn repeated_appear_does_not_leak_a_second_subscription() {
    let f = fixture(Duration::from_millis(10));

    f.store.send(AppAction::OnAppear).await.unwrap();
    f.store.send(AppAction::OnAppear).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // With a leaked duplicate, one pushed batch would feed back twice
    let mut actions = f.store.subscribe_actions();
    f.completer.send(Ok(vec![candidate()]));

    let mut batches = 0;
    while let Ok(Ok(action)) =
        tokio::time::timeout(Duration::from_millis(100), actions.recv()).await
    {
        if matches!(action, AppAction::CompletionsUpdated(_)) {
            batches += 1;
        }
    }
    assert_eq!(batches, 1);
}

#[tokio::test]
async fn permission_flow_grant_requests_location() {
    let f = fixture(Duration::from_millis(10));

    f.store.send(AppAction::OnAppear).await.unwrap();
    f.store
        .send(AppAction::CurrentLocationButtonTapped)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(f.store.state(|s| s.is_requesting_current_location).await);
    assert_eq!(f.location.authorization_request_count(), 1);
    assert_eq!(f.location.location_request_count(), 0);

    // The user answers the prompt; the delegate reports the grant
    f.location
        .set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    f.location.send_event(LocationEvent::AuthorizationChanged(
        AuthorizationStatus::AuthorizedWhenInUse,
    ));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(f.location.location_request_count(), 1);

    // The fix arrives and recenters the viewport
    f.location.send_event(LocationEvent::LocationsUpdated(vec![
        Coordinate::new(48.85, 2.35),
    ]));
    tokio::time::sleep(Duration::from_millis(30)).await;

    let (region, requesting) = f
        .store
        .state(|s| (s.region, s.is_requesting_current_location))
        .await;
    assert_eq!(
        region,
        Region::new(Coordinate::new(48.85, 2.35), Span::new(0.05, 0.05))
    );
    assert!(!requesting);
}

#[tokio::test]
async fn permission_flow_denial_alerts_once() {
    let f = fixture(Duration::from_millis(10));

    f.store.send(AppAction::OnAppear).await.unwrap();
    f.store
        .send(AppAction::CurrentLocationButtonTapped)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    f.location.set_authorization(AuthorizationStatus::Denied);
    f.location.send_event(LocationEvent::AuthorizationChanged(
        AuthorizationStatus::Denied,
    ));
    tokio::time::sleep(Duration::from_millis(30)).await;

    let (alert, requesting) = f
        .store
        .state(|s| (s.alert.clone(), s.is_requesting_current_location))
        .await;
    assert!(alert.is_some());
    assert!(!requesting);
    assert_eq!(f.location.location_request_count(), 0);

    f.store
        .send(AppAction::DismissAlertButtonTapped)
        .await
        .unwrap();
    assert!(f.store.state(|s| s.alert.is_none()).await);
}

#[tokio::test]
async fn path_monitor_updates_connectivity() {
    let f = fixture(Duration::from_millis(10));

    f.store.send(AppAction::OnAppear).await.unwrap();
    f.connectivity.send(ConnectivityStatus::Unsatisfied);
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(
        f.store.state(|s| s.connectivity).await,
        ConnectivityStatus::Unsatisfied
    );

    // Offline, the location button alerts instead of prompting
    f.store
        .send(AppAction::CurrentLocationButtonTapped)
        .await
        .unwrap();
    assert!(f.store.state(|s| s.alert.is_some()).await);
    assert_eq!(f.location.authorization_request_count(), 0);
}
