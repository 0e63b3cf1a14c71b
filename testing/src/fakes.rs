//! Deterministic doubles for the application's service boundaries.
//!
//! Every double satisfies the corresponding trait from `mapsearch-core`
//! and exposes imperative handles for tests: push values into the
//! streams, swap canned responses, inspect recorded calls. Doubles that
//! have not been given a response fail loudly with an "unimplemented"
//! service error, so a test exercising an unexpected boundary is caught
//! immediately.

use futures::stream::BoxStream;
use mapsearch_core::connectivity::{ConnectivityService, ConnectivityStatus};
use mapsearch_core::geo::Region;
use mapsearch_core::location::{AuthorizationStatus, LocationEvent, LocationService};
use mapsearch_core::search::{
    CompletionCandidate, CompletionService, SearchError, SearchResponse, SearchService,
};
use mapsearch_core::weather::{WeatherError, WeatherReading, WeatherService};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Adapt a broadcast receiver into the boxed stream shape the service
/// traits use. Lagged receivers skip ahead; a closed channel ends the
/// stream.
fn broadcast_stream<T: Clone + Send + 'static>(
    mut rx: broadcast::Receiver<T>,
) -> BoxStream<'static, T> {
    Box::pin(async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(item) => yield item,
                Err(broadcast::error::RecvError::Lagged(_)) => {},
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

/// Completion double: tests push suggestion batches, or script an
/// automatic batch per query.
#[derive(Clone)]
pub struct ScriptedCompletionService {
    results: broadcast::Sender<Result<Vec<CompletionCandidate>, SearchError>>,
    on_query: Arc<Mutex<Option<Vec<CompletionCandidate>>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedCompletionService {
    /// Create a double with no scripted responses
    #[must_use]
    pub fn new() -> Self {
        let (results, _) = broadcast::channel(16);
        Self {
            results,
            on_query: Arc::new(Mutex::new(None)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Push a suggestion batch (or error) to every subscriber
    pub fn send(&self, result: Result<Vec<CompletionCandidate>, SearchError>) {
        let _ = self.results.send(result);
    }

    /// Script an automatic batch sent whenever `set_query` is called
    pub fn respond_with(&self, candidates: Vec<CompletionCandidate>) {
        *lock(&self.on_query) = Some(candidates);
    }

    /// Every query fragment the application has set, oldest first
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

impl Default for ScriptedCompletionService {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionService for ScriptedCompletionService {
    fn completions(&self) -> BoxStream<'static, Result<Vec<CompletionCandidate>, SearchError>> {
        broadcast_stream(self.results.subscribe())
    }

    fn set_query(&self, query: String) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        lock(&self.queries).push(query);
        if let Some(candidates) = lock(&self.on_query).clone() {
            let _ = self.results.send(Ok(candidates));
        }
        Box::pin(std::future::ready(()))
    }
}

/// Search double answering `resolve` with one canned response.
#[derive(Clone)]
pub struct StubSearchService {
    response: Arc<Mutex<Option<Result<SearchResponse, SearchError>>>>,
    latency: Arc<Mutex<Duration>>,
    resolved: Arc<Mutex<Vec<CompletionCandidate>>>,
}

impl StubSearchService {
    /// A double that fails every call; give it a response with
    /// [`Self::respond_with`]
    #[must_use]
    pub fn failing() -> Self {
        Self {
            response: Arc::new(Mutex::new(None)),
            latency: Arc::new(Mutex::new(Duration::ZERO)),
            resolved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Canned success for every subsequent call
    pub fn respond_with(&self, response: SearchResponse) {
        *lock(&self.response) = Some(Ok(response));
    }

    /// Canned failure for every subsequent call
    pub fn fail_with(&self, error: SearchError) {
        *lock(&self.response) = Some(Err(error));
    }

    /// Artificial latency before each response (for cancellation tests)
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// Every candidate the application has resolved, oldest first
    #[must_use]
    pub fn resolved(&self) -> Vec<CompletionCandidate> {
        lock(&self.resolved).clone()
    }
}

impl Default for StubSearchService {
    fn default() -> Self {
        Self::failing()
    }
}

impl SearchService for StubSearchService {
    fn resolve(
        &self,
        candidate: CompletionCandidate,
    ) -> Pin<Box<dyn Future<Output = Result<SearchResponse, SearchError>> + Send + '_>> {
        lock(&self.resolved).push(candidate);
        let response = lock(&self.response).clone();
        let latency = *lock(&self.latency);

        Box::pin(async move {
            if latency > Duration::ZERO {
                tokio::time::sleep(latency).await;
            }
            response.unwrap_or_else(|| {
                Err(SearchError::Service(
                    "StubSearchService.resolve is unimplemented".to_string(),
                ))
            })
        })
    }
}

/// Location double with settable authorization and a pushable delegate
/// stream; records every request the application makes.
#[derive(Clone)]
pub struct ControlledLocationService {
    authorization: Arc<Mutex<AuthorizationStatus>>,
    services_enabled: Arc<AtomicBool>,
    events: broadcast::Sender<LocationEvent>,
    authorization_requests: Arc<AtomicUsize>,
    location_requests: Arc<AtomicUsize>,
}

impl ControlledLocationService {
    /// Create a double: services enabled, authorization not determined
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            authorization: Arc::new(Mutex::new(AuthorizationStatus::NotDetermined)),
            services_enabled: Arc::new(AtomicBool::new(true)),
            events,
            authorization_requests: Arc::new(AtomicUsize::new(0)),
            location_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the authorization status subsequent queries report
    pub fn set_authorization(&self, status: AuthorizationStatus) {
        *lock(&self.authorization) = status;
    }

    /// Toggle the device-wide location services switch
    pub fn set_services_enabled(&self, enabled: bool) {
        self.services_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Push a delegate event to every subscriber
    pub fn send_event(&self, event: LocationEvent) {
        let _ = self.events.send(event);
    }

    /// How many times the application prompted for authorization
    #[must_use]
    pub fn authorization_request_count(&self) -> usize {
        self.authorization_requests.load(Ordering::SeqCst)
    }

    /// How many times the application requested a position fix
    #[must_use]
    pub fn location_request_count(&self) -> usize {
        self.location_requests.load(Ordering::SeqCst)
    }
}

impl Default for ControlledLocationService {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationService for ControlledLocationService {
    fn authorization_status(&self) -> AuthorizationStatus {
        *lock(&self.authorization)
    }

    fn location_services_enabled(&self) -> bool {
        self.services_enabled.load(Ordering::SeqCst)
    }

    fn request_when_in_use_authorization(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.authorization_requests.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::ready(()))
    }

    fn request_location(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.location_requests.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::ready(()))
    }

    fn delegate_events(&self) -> BoxStream<'static, LocationEvent> {
        broadcast_stream(self.events.subscribe())
    }
}

/// Connectivity double: tests push reachability states.
#[derive(Clone)]
pub struct ScriptedConnectivityService {
    paths: broadcast::Sender<ConnectivityStatus>,
}

impl ScriptedConnectivityService {
    /// Create a double with no queued states
    #[must_use]
    pub fn new() -> Self {
        let (paths, _) = broadcast::channel(16);
        Self { paths }
    }

    /// Push a reachability state to every subscriber
    pub fn send(&self, status: ConnectivityStatus) {
        let _ = self.paths.send(status);
    }
}

impl Default for ScriptedConnectivityService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityService for ScriptedConnectivityService {
    fn monitor_path(&self) -> BoxStream<'static, ConnectivityStatus> {
        broadcast_stream(self.paths.subscribe())
    }
}

/// Weather double with a per-call script and a canned fallback.
///
/// Each `enqueue`d entry answers exactly one fetch (front first) with
/// its own latency - the tool for stale-response tests, where an older
/// slow request must lose to a newer fast one.
#[derive(Clone)]
pub struct StubWeatherService {
    script: Arc<Mutex<VecDeque<(Duration, Result<WeatherReading, WeatherError>)>>>,
    fallback: Arc<Mutex<Option<Result<WeatherReading, WeatherError>>>>,
    fetches: Arc<Mutex<Vec<Region>>>,
}

impl StubWeatherService {
    /// A double that fails every call; give it responses with
    /// [`Self::respond_with`] or [`Self::enqueue`]
    #[must_use]
    pub fn failing() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(None)),
            fetches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Canned reading for every fetch the script does not cover
    pub fn respond_with(&self, reading: WeatherReading) {
        *lock(&self.fallback) = Some(Ok(reading));
    }

    /// Canned failure for every fetch the script does not cover
    pub fn fail_with(&self, error: WeatherError) {
        *lock(&self.fallback) = Some(Err(error));
    }

    /// Script the next fetch: wait `latency`, then answer with `result`
    pub fn enqueue(&self, latency: Duration, result: Result<WeatherReading, WeatherError>) {
        lock(&self.script).push_back((latency, result));
    }

    /// Every region the application has fetched weather for, oldest first
    #[must_use]
    pub fn fetches(&self) -> Vec<Region> {
        lock(&self.fetches).clone()
    }
}

impl Default for StubWeatherService {
    fn default() -> Self {
        Self::failing()
    }
}

impl WeatherService for StubWeatherService {
    fn fetch(
        &self,
        region: Region,
    ) -> Pin<Box<dyn Future<Output = Result<WeatherReading, WeatherError>> + Send + '_>> {
        lock(&self.fetches).push(region);

        let (latency, result) = lock(&self.script).pop_front().unwrap_or_else(|| {
            (
                Duration::ZERO,
                lock(&self.fallback).clone().unwrap_or_else(|| {
                    Err(WeatherError::Service(
                        "StubWeatherService.fetch is unimplemented".to_string(),
                    ))
                }),
            )
        });

        Box::pin(async move {
            if latency > Duration::ZERO {
                tokio::time::sleep(latency).await;
            }
            result
        })
    }
}
