//! The Reducer trait - core abstraction for business logic.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
//! They contain all business logic, never suspend, and are deterministic
//! and testable.

use crate::effect::Effect;
use smallvec::SmallVec;

/// The Reducer trait - core abstraction for business logic
///
/// # Type Parameters
///
/// - `State`: The domain state this reducer operates on
/// - `Action`: The action type this reducer processes
/// - `Environment`: The injected service capabilities this reducer needs
///
/// # Example
///
/// ```ignore
/// impl Reducer for AppReducer {
///     type State = AppState;
///     type Action = AppAction;
///     type Environment = AppEnvironment;
///
///     fn reduce(
///         &self,
///         state: &mut AppState,
///         action: AppAction,
///         env: &AppEnvironment,
///     ) -> SmallVec<[Effect<AppAction>; 4]> {
///         match action {
///             AppAction::QueryChanged(query) => {
///                 state.query = query;
///                 smallvec![Effect::None]
///             }
///             _ => smallvec![Effect::None],
///         }
///     }
/// }
/// ```
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Reduce an action into state changes and effects
    ///
    /// This is a pure function that:
    /// 1. Inspects the action
    /// 2. Updates state in place
    /// 3. Returns effect descriptions to be executed
    ///
    /// The reducer itself never suspends; all suspension points live
    /// inside effects.
    ///
    /// # Arguments
    ///
    /// - `state`: Mutable reference to current state
    /// - `action`: The action to process
    /// - `env`: Reference to injected dependencies
    ///
    /// # Returns
    ///
    /// The effects to be executed by the runtime
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}
