//! Effect descriptions and cancellation keys.
//!
//! Effects are NOT executed immediately. They are descriptions of what
//! should happen, returned from reducers and executed by the Store
//! runtime. Execution, cancellation, and debouncing all live in the
//! runtime crate; this module only defines the vocabulary.

use futures::Stream;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future producing an optional follow-up action.
pub type BoxActionFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

/// Boxed stream of follow-up actions.
pub type BoxActionStream<Action> = Pin<Box<dyn Stream<Item = Action> + Send>>;

/// Stable identifier grouping effects for cancellation.
///
/// Starting a new effect under the same key can supersede a prior one,
/// and `Effect::Cancel` terminates everything registered under the key.
/// Call sites share a key by sharing the same string constant.
///
/// # Examples
///
/// ```
/// use mapsearch_core::effect::EffectId;
///
/// const WEATHER_REQUEST: &str = "weather-request";
///
/// let id = EffectId::new(WEATHER_REQUEST);
/// assert_eq!(id.as_str(), "weather-request");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EffectId(String);

impl EffectId {
    /// Create a new `EffectId` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EffectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EffectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for EffectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Effect type - describes a side effect to be executed.
///
/// # Type Parameters
///
/// - `Action`: The action type that effects can produce (feedback loop)
///
/// # Shapes
///
/// Three effect shapes cover every service boundary:
///
/// - **fire-and-forget**: a [`Effect::Future`] resolving to `None`
/// - **single-value**: a [`Effect::Future`] resolving to `Some(action)`
/// - **stream**: a [`Effect::Stream`] yielding zero or more actions until
///   exhausted or cancelled
///
/// # Failure
///
/// There is no failure channel here. A failing service call is encoded
/// as a failure-tagged action by the call site (e.g. an action carrying
/// a `Result`), so the store never crashes on effect failure.
#[allow(missing_docs)]
pub enum Effect<Action> {
    /// No-op effect
    None,

    /// Run effects in parallel; follow-up actions interleave in
    /// completion order, but each individual stream preserves its own
    /// emission order.
    Parallel(Vec<Effect<Action>>),

    /// Delayed action (for timeouts)
    Delay {
        /// How long to wait
        duration: Duration,
        /// Action to dispatch after delay
        action: Box<Action>,
    },

    /// Arbitrary async computation
    ///
    /// Returns `Option<Action>` - if Some, the action is fed back into
    /// the reducer
    Future(BoxActionFuture<Action>),

    /// A long-lived source of actions (service subscription). Runs until
    /// the stream ends or the effect is cancelled by key.
    Stream(BoxActionStream<Action>),

    /// Tag the inner effect with a cancellation key.
    ///
    /// While the inner effect runs it is addressable via
    /// [`Effect::Cancel`] with the same key. With `cancel_in_flight`
    /// set, anything already running under the key is cancelled before
    /// the inner effect starts, so at most one effect lives under the
    /// key.
    Cancellable {
        /// Registry key shared across call sites
        id: EffectId,
        /// Cancel whatever is already running under `id` first
        cancel_in_flight: bool,
        /// The effect being tagged
        effect: Box<Effect<Action>>,
    },

    /// Terminate every effect registered under the key, suppressing any
    /// in-flight result. Cancelling an idle key is a no-op.
    Cancel(EffectId),

    /// Restartable quiet-period timer keyed by `id`.
    ///
    /// Scheduling a new debounced effect under the same key cancels the
    /// pending timer and restarts it; only the last effect within a
    /// quiet period survives to run.
    Debounce {
        /// Timer key shared across call sites
        id: EffectId,
        /// Quiet period that must elapse before the effect runs
        delay: Duration,
        /// The effect to run once the timer fires
        effect: Box<Effect<Action>>,
    },
}

// Manual Debug implementation since Future/Stream don't implement Debug
impl<Action> fmt::Debug for Effect<Action>
where
    Action: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Parallel(effects) => {
                f.debug_tuple("Effect::Parallel").field(effects).finish()
            },
            Effect::Delay { duration, action } => f
                .debug_struct("Effect::Delay")
                .field("duration", duration)
                .field("action", action)
                .finish(),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            Effect::Stream(_) => write!(f, "Effect::Stream(<stream>)"),
            Effect::Cancellable {
                id,
                cancel_in_flight,
                effect,
            } => f
                .debug_struct("Effect::Cancellable")
                .field("id", id)
                .field("cancel_in_flight", cancel_in_flight)
                .field("effect", effect)
                .finish(),
            Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            Effect::Debounce { id, delay, effect } => f
                .debug_struct("Effect::Debounce")
                .field("id", id)
                .field("delay", delay)
                .field("effect", effect)
                .finish(),
        }
    }
}

impl<Action> Effect<Action> {
    /// Combine effects to run in parallel
    #[must_use]
    pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Parallel(effects)
    }

    /// Tag this effect with a cancellation key.
    ///
    /// With `cancel_in_flight`, whatever is already running under the
    /// key is cancelled before this effect starts.
    #[must_use]
    pub fn cancellable(self, id: impl Into<EffectId>, cancel_in_flight: bool) -> Effect<Action> {
        Effect::Cancellable {
            id: id.into(),
            cancel_in_flight,
            effect: Box::new(self),
        }
    }

    /// Debounce this effect under a key with the given quiet period.
    #[must_use]
    pub fn debounce(self, id: impl Into<EffectId>, delay: Duration) -> Effect<Action> {
        Effect::Debounce {
            id: id.into(),
            delay,
            effect: Box::new(self),
        }
    }

    /// Cancel every effect running under the key.
    #[must_use]
    pub fn cancel(id: impl Into<EffectId>) -> Effect<Action> {
        Effect::Cancel(id.into())
    }
}
