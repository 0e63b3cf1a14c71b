//! Map-search demo binary
//!
//! Drives the store through the main interaction flow against scripted
//! service doubles: appear, type a query, pick a completion, pan the
//! map, and watch the debounced weather refetch land.

use mapsearch_app::{AppAction, AppEnvironment, AppReducer, AppState};
use mapsearch_core::geo::{Coordinate, Region, Span};
use mapsearch_core::location::AuthorizationStatus;
use mapsearch_core::search::{CompletionCandidate, ResolvedPlace, SearchResponse};
use mapsearch_core::weather::WeatherReading;
use mapsearch_runtime::Store;
use mapsearch_testing::fakes::{
    ControlledLocationService, ScriptedCompletionService, ScriptedConnectivityService,
    StubSearchService, StubWeatherService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mapsearch=debug,mapsearch_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Mapsearch: reducer/store/effect walkthrough ===\n");

    // Scripted services standing in for the real adapters
    let completer = Arc::new(ScriptedCompletionService::new());
    let search = Arc::new(StubSearchService::failing());
    let location = Arc::new(ControlledLocationService::new());
    let connectivity = Arc::new(ScriptedConnectivityService::new());
    let weather = Arc::new(StubWeatherService::failing());

    let candidate = CompletionCandidate::new("Apple Store", "Search Nearby");
    completer.respond_with(vec![candidate.clone()]);
    search.respond_with(SearchResponse {
        bounding_region: Region::new(Coordinate::new(40.764, -73.973), Span::new(0.02, 0.02)),
        places: vec![ResolvedPlace::new(
            Coordinate::new(40.7638, -73.9730),
            "Apple Store, Fifth Avenue",
        )],
    });
    weather.respond_with(WeatherReading {
        temp: Some(284.6),
        humidity: Some(71.0),
    });
    location.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);

    let env = AppEnvironment::new(
        completer.clone(),
        search,
        location,
        connectivity,
        weather,
        Arc::new(mapsearch_core::environment::SystemClock),
    )
    .with_region_debounce(Duration::from_millis(300));

    let store = Store::new(AppState::default(), AppReducer::new(), env);

    // Appear: subscribes the completion, location, and path streams
    println!(">>> Sending: OnAppear");
    let _ = store.send(AppAction::OnAppear).await;

    // Type a query; the scripted completer answers on the stream
    println!(">>> Sending: QueryChanged(\"Apple\")");
    let _ = store.send(AppAction::QueryChanged("Apple".to_string())).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (query, completions) = store
        .state(|s| (s.query.clone(), s.completions.clone()))
        .await;
    println!("    query = {query:?}");
    println!("    completions = {completions:?}\n");

    // Pick the suggestion; the stub search resolves it
    println!(">>> Sending: TappedCompletion(Apple Store)");
    let _ = store.send(AppAction::TappedCompletion(candidate)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (query, region, items) = store
        .state(|s| (s.query.clone(), s.region, s.map_items.clone()))
        .await;
    println!("    query = {query:?}");
    println!("    region = {region:?}");
    println!("    map_items = {items:?}\n");

    // Pan the map: a burst of RegionWillChange collapses to one settled
    // region, which triggers exactly one weather fetch
    println!(">>> Sending: RegionWillChange x3 (panning burst)");
    for step in 1..=3 {
        let delta = f64::from(step) * 0.01;
        let region = Region::new(
            Coordinate::new(40.764 + delta, -73.973),
            Span::new(0.02, 0.02),
        );
        let _ = store.send(AppAction::RegionWillChange(region)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    println!("    ...waiting out the debounce window...");
    tokio::time::sleep(Duration::from_millis(500)).await;

    let (region, weather_reading) = store.state(|s| (s.region, s.weather)).await;
    println!("    region = {region:?}");
    println!("    weather = {weather_reading:?}\n");

    println!("=== Walkthrough complete ===");
    println!("\nKey concepts demonstrated:");
    println!("  • State: AppState (one aggregate, owned by the store)");
    println!("  • Action: AppAction (user input, service callbacks, timers)");
    println!("  • Reducer: pure function (state, action, env) → (new state, effects)");
    println!("  • Effects: streams, keyed cancellation, debounce");
    println!("  • Environment: five service traits + clock, swappable for doubles");

    let _ = store.shutdown(Duration::from_secs(2)).await;
}
