//! # Mapsearch Runtime
//!
//! Runtime implementation for the mapsearch architecture.
//!
//! This crate provides the Store runtime that coordinates reducer
//! execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Cancellation Registry**: Keyed cancellation handles for
//!   superseding and terminating in-flight effects
//! - **Event Loop**: Manages the action → reducer → effects → action
//!   feedback loop
//!
//! ## Concurrency Model
//!
//! All state transitions happen through `send`, serialized on a write
//! lock - no two reducer invocations observe a torn intermediate state.
//! Effects execute concurrently with each other and with the store's
//! idle state, off the state-mutation path; only their feedback re-enters
//! the serialized dispatch path.
//!
//! ## Example
//!
//! ```ignore
//! use mapsearch_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use mapsearch_core::effect::Effect;
use mapsearch_core::reducer::Reducer;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keyed cancellation handles for in-flight effects
pub mod cancellation;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown
        /// initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires
        /// before a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        ///
        /// The action broadcast channel was closed, typically because
        /// the store is shutting down.
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

use cancellation::{CancellationGuard, CancellationRegistry, CancellationToken};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Effect tracking mode - controls how effects are tracked for completion
///
/// # Modes
///
/// - **Direct**: Tracks only immediate effects (default)
/// - **Cascading**: Tracks effects transitively, following the entire
///   effect tree through feedback actions
#[derive(Debug, Clone)]
pub enum TrackingMode {
    /// Track only immediate effects spawned by this action
    Direct,

    /// Track effects transitively - any effects produced by feedback
    /// actions are also tracked as children
    Cascading {
        /// Child effect handles that need to complete before this handle is done
        children: Arc<Mutex<Vec<EffectHandle>>>,
    },
}

impl TrackingMode {
    /// Create a cascading tracking mode with an empty child set
    #[must_use]
    pub fn cascading() -> Self {
        Self::Cascading {
            children: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The mode feedback sends inherit: cascading modes share their
    /// child set so the whole effect tree settles one handle.
    fn child(&self) -> Self {
        match self {
            Self::Direct => Self::Direct,
            Self::Cascading { children } => Self::Cascading {
                children: Arc::clone(children),
            },
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`store::Store::send()`] to allow waiting for effects to
/// complete. Each action gets a handle that can be awaited to know when
/// its effects (and, in cascading mode, their feedback effects) are done.
///
/// Long-lived stream effects only settle their handle once cancelled, so
/// waiting on a handle covering a stream subscription needs a timeout.
///
/// # Example
///
/// ```ignore
/// let handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // All effects from Action::Start are now complete
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    mode: TrackingMode,
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle with the given tracking mode
    fn new(mode: TrackingMode) -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            mode: mode.clone(),
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            mode,
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    ///
    /// Useful for initialization in loops where you need a `last_handle`.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            mode: TrackingMode::Direct,
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Wait for all effects to complete
    ///
    /// Blocks until the effect counter reaches zero; in cascading mode,
    /// recursively waits for every child handle as well.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting cascading children is poisoned.
    /// This should only happen if a thread panicked while holding the lock.
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    pub async fn wait(&mut self) {
        // Wait for counter to reach zero
        while self.effects.load(Ordering::SeqCst) > 0 {
            let _ = self.completion.changed().await;
        }

        // If cascading, recursively wait for all children
        if let TrackingMode::Cascading { children } = &self.mode {
            loop {
                let handles = {
                    let mut guard = children.lock().unwrap();
                    if guard.is_empty() {
                        break;
                    }
                    guard.drain(..).collect::<Vec<_>>()
                };

                for mut handle in handles {
                    Box::pin(handle.wait()).await;
                }
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before all effects
    /// complete.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting cascading children is poisoned
    /// (via `wait()`).
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("mode", &self.mode)
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    mode: TrackingMode,
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect
/// panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal: the cancellation scope an effect executes under.
///
/// Carries the joined token of every `Cancellable` wrapper above the
/// effect plus the registry guards keeping those registrations alive
/// for as long as the effect runs.
struct CancelScope {
    token: CancellationToken,
    guards: Vec<Arc<CancellationGuard>>,
}

impl CancelScope {
    /// Extend an (optional) outer scope with one more registration.
    fn extend(
        outer: Option<CancelScope>,
        token: CancellationToken,
        guard: CancellationGuard,
    ) -> CancelScope {
        match outer {
            Some(mut scope) => {
                scope.token.join(token);
                scope.guards.push(Arc::new(guard));
                scope
            },
            None => CancelScope {
                token,
                guards: vec![Arc::new(guard)],
            },
        }
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Clone for CancelScope {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            guards: self.guards.clone(),
        }
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, CancelScope, CancellationRegistry,
        DecrementGuard, Duration, Effect, EffectHandle, EffectTracking, Ordering, Reducer,
        RwLock, StoreError, TrackingMode,
    };
    use futures::StreamExt;
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the write lock serializes dispatch)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected service capabilities)
    /// 4. Effect execution (with feedback loop and keyed cancellation)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Store::new(
    ///     AppState::default(),
    ///     AppReducer::new(),
    ///     production_environment(),
    /// );
    ///
    /// store.send(AppAction::OnAppear).await?;
    /// ```
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        cancellations: CancellationRegistry,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Action broadcast channel for observing actions produced by
        /// effects. Enables request-response patterns
        /// (`send_and_wait_for`) and test assertions on feedback actions.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Creates a Store with the default action broadcast capacity of
        /// 16 (increase with `with_broadcast_capacity`).
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
        }

        /// Create a new Store with custom action broadcast capacity
        ///
        /// Use this constructor when observers consume feedback actions
        /// slowly (many waiters, long bursts of stream emissions).
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                cancellations: CancellationRegistry::new(),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Initiate graceful shutdown of the store
        ///
        /// This method:
        /// 1. Sets the shutdown flag (rejecting new actions)
        /// 2. Cancels every keyed effect (long-lived stream subscriptions
        ///    would otherwise hold the store open forever)
        /// 3. Waits for pending effects to complete (with timeout)
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires
        /// before all pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            // Set shutdown flag to reject new actions
            self.shutdown.store(true, Ordering::Release);

            // Release long-lived subscriptions and in-flight requests
            let cancelled = self.cancellations.cancel_all();
            tracing::debug!(cancelled, "Cancelled keyed effects for shutdown");

            // Wait for pending effects with timeout
            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(100);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running",
                        pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// This is the primary way to interact with the store:
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Commits the new state synchronously
        /// 4. Executes returned effects asynchronously
        /// 5. Effects may produce more actions (feedback loop)
        ///
        /// Multiple concurrent `send()` calls serialize at the reducer
        /// level; effects complete in non-deterministic order relative
        /// to each other.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is
        /// shutting down.
        ///
        /// # Panics
        ///
        /// If the reducer panics, the panic will propagate and halt the
        /// store. Reducers should be pure functions that do not panic.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            self.send_internal(action, TrackingMode::Direct).await
        }

        /// Send an action with an explicit tracking mode
        ///
        /// With [`TrackingMode::cascading()`] the returned handle settles
        /// only after the whole effect tree - including effects spawned
        /// by feedback actions - has completed. Useful in tests that need
        /// to flush every consequence of an action.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is
        /// shutting down.
        pub async fn send_tracked(
            &self,
            action: A,
            mode: TrackingMode,
        ) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            self.send_internal(action, mode).await
        }

        /// Send an action and wait for a matching result action
        ///
        /// Designed for request-response flows: subscribes to the action
        /// broadcast BEFORE sending (avoiding the race), sends the
        /// initial action, then waits for the first effect-produced
        /// action matching the predicate.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before matching
        ///   action received
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel
        ///   closed (store shutting down)
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending to avoid race condition
            let mut rx = self.action_broadcast.subscribe();

            // Send the initial action
            self.send(action).await?;

            // Wait for matching action with timeout
            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {}, // Not the action we want, keep waiting
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Slow consumer, some actions were dropped.
                            // Keep waiting - the timeout catches a dropped
                            // terminal action.
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Only feedback actions are broadcast, not the initial actions
        /// passed to `send`.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// Access state through a closure to ensure the lock is released
        /// promptly:
        ///
        /// ```ignore
        /// let query = store.state(|s| s.query.clone()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Whether any effect is currently registered under the key
        ///
        /// Exposed for tests asserting subscription lifecycles.
        #[must_use]
        pub fn has_active_effect(&self, id: &mapsearch_core::effect::EffectId) -> bool {
            self.cancellations.is_active(id)
        }

        /// Internal send implementation with tracking control
        #[tracing::instrument(skip(self, action, tracking_mode), name = "store_send_internal")]
        async fn send_internal(
            &self,
            action: A,
            tracking_mode: TrackingMode,
        ) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            // Check if store is shutting down
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.actions.total").increment(1);

            // Create tracking for this action
            let (handle, tracking) = EffectHandle::new(tracking_mode);

            let effects = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                // Metrics: Time reducer execution
                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut state, action, &self.environment);
                let duration = start.elapsed();
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(duration.as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            // Execute effects with tracking; state is already committed
            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone(), None);
            }
            tracing::debug!("Action processing completed, returning handle");

            Ok(handle)
        }

        /// Feed an effect-produced action back into the store.
        ///
        /// Broadcasts to observers first, then dispatches. In cascading
        /// mode the child handle is chained onto the parent so the whole
        /// tree settles one handle.
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        async fn feedback(&self, tracking: &EffectTracking, action: A)
        where
            R: Clone,
            E: Clone,
        {
            // Broadcast to observers (tests, request-response waiters)
            let _ = self.action_broadcast.send(action.clone());

            match self.send_internal(action, tracking.mode.child()).await {
                Ok(child) => {
                    if let TrackingMode::Cascading { children } = &tracking.mode {
                        children.lock().unwrap().push(child);
                    }
                },
                Err(_) => {
                    // Store is shutting down; the action is dropped
                    tracing::debug!("Dropped feedback action during shutdown");
                },
            }
        }

        /// Execute an effect with tracking and an optional cancel scope
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, feeds back the
        ///   resulting action if `Some`
        /// - `Stream`: Feeds back every emitted action until the stream
        ///   ends or the scope is cancelled
        /// - `Delay`: Waits for duration, then feeds back the action
        /// - `Parallel`: Executes effects concurrently under the same
        ///   scope
        /// - `Cancellable`: Registers the inner effect under its key and
        ///   reruns it under the extended scope
        /// - `Cancel`: Signals every effect under the key
        /// - `Debounce`: Supersedes the pending timer under the key, then
        ///   runs the inner effect once the quiet period elapses
        ///
        /// # Error Handling Strategy
        ///
        /// Effect tasks never feed an action back once their scope is
        /// cancelled - a cancelled effect simply produces no further
        /// actions. The [`DecrementGuard`] ensures the tracking counter
        /// is updated even if an effect panics.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned, so pass by value is intentional
        #[allow(clippy::too_many_lines)] // One arm per effect variant
        #[tracing::instrument(skip(self, effect, tracking, scope), name = "execute_effect")]
        fn execute_effect_internal(
            &self,
            effect: Effect<A>,
            tracking: EffectTracking,
            scope: Option<CancelScope>,
        ) where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();

                    // Track global pending effects for shutdown
                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let tracking_clone = tracking.clone();
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking_clone.clone());
                        let _pending_guard = pending_guard; // Decrement on drop

                        let produced = match &scope {
                            Some(s) => {
                                let mut token = s.token.clone();
                                tokio::select! {
                                    () = token.cancelled() => {
                                        metrics::counter!("store.effects.cancelled").increment(1);
                                        tracing::trace!("Effect::Future cancelled");
                                        None
                                    },
                                    produced = fut => produced,
                                }
                            },
                            None => fut.await,
                        };

                        // A result that raced a just-issued cancel must not land
                        if scope.as_ref().is_some_and(CancelScope::is_cancelled) {
                            tracing::trace!("Suppressing result of cancelled Effect::Future");
                            return;
                        }

                        if let Some(action) = produced {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feedback(&tracking_clone, action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
                Effect::Stream(stream) => {
                    tracing::trace!("Executing Effect::Stream");
                    metrics::counter!("store.effects.executed", "type" => "stream").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let tracking_clone = tracking.clone();
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking_clone.clone());
                        let _pending_guard = pending_guard; // Decrement on drop

                        let mut stream = stream;
                        match scope {
                            Some(scope) => {
                                let mut token = scope.token.clone();
                                loop {
                                    let item = tokio::select! {
                                        () = token.cancelled() => {
                                            metrics::counter!("store.effects.cancelled")
                                                .increment(1);
                                            tracing::trace!("Effect::Stream cancelled");
                                            None
                                        },
                                        item = stream.next() => item,
                                    };

                                    let Some(action) = item else { break };
                                    if scope.is_cancelled() {
                                        break;
                                    }
                                    store.feedback(&tracking_clone, action).await;
                                }
                            },
                            None => {
                                while let Some(action) = stream.next().await {
                                    store.feedback(&tracking_clone, action).await;
                                }
                            },
                        }
                        tracing::trace!("Effect::Stream completed");
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let tracking_clone = tracking.clone();
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking_clone.clone());
                        let _pending_guard = pending_guard; // Decrement on drop

                        if let Some(s) = &scope {
                            let mut token = s.token.clone();
                            tokio::select! {
                                () = token.cancelled() => {
                                    metrics::counter!("store.effects.cancelled").increment(1);
                                    tracing::trace!("Effect::Delay cancelled");
                                    return;
                                },
                                () = tokio::time::sleep(duration) => {},
                            }
                            if s.is_cancelled() {
                                return;
                            }
                        } else {
                            tokio::time::sleep(duration).await;
                        }

                        tracing::trace!("Effect::Delay completed, sending action");
                        store.feedback(&tracking_clone, *action).await;
                    });
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);

                    // Execute all effects concurrently, each with the same
                    // tracking and scope
                    for effect in effects {
                        self.execute_effect_internal(effect, tracking.clone(), scope.clone());
                    }
                },
                Effect::Cancellable {
                    id,
                    cancel_in_flight,
                    effect,
                } => {
                    tracing::trace!(id = %id, cancel_in_flight, "Executing Effect::Cancellable");
                    metrics::counter!("store.effects.executed", "type" => "cancellable")
                        .increment(1);

                    let (token, guard) = self.cancellations.register(&id, cancel_in_flight);
                    let scope = CancelScope::extend(scope, token, guard);
                    self.execute_effect_internal(*effect, tracking, Some(scope));
                },
                Effect::Cancel(id) => {
                    let cancelled = self.cancellations.cancel(&id);
                    tracing::debug!(id = %id, cancelled, "Executing Effect::Cancel");
                    metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);
                },
                Effect::Debounce { id, delay, effect } => {
                    tracing::trace!(id = %id, "Executing Effect::Debounce (delay: {:?})", delay);
                    metrics::counter!("store.effects.executed", "type" => "debounce").increment(1);

                    // Superseding a pending debounce cancels its timer
                    let (token, guard) = self.cancellations.register(&id, true);
                    let scope = CancelScope::extend(scope, token, guard);

                    tracking.increment();
                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let tracking_clone = tracking.clone();
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking_clone.clone());
                        let _pending_guard = pending_guard; // Decrement on drop

                        let mut token = scope.token.clone();
                        tokio::select! {
                            () = token.cancelled() => {
                                metrics::counter!("store.debounce.superseded").increment(1);
                                tracing::trace!("Debounce timer superseded");
                                return;
                            },
                            () = tokio::time::sleep(delay) => {},
                        }
                        if scope.is_cancelled() {
                            return;
                        }

                        // Quiet period elapsed; the surviving effect runs
                        // under the same scope so the key still addresses it
                        tracing::trace!("Debounce quiet period elapsed, running effect");
                        store.execute_effect_internal(*effect, tracking_clone.clone(), Some(scope));
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                cancellations: self.cancellations.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
