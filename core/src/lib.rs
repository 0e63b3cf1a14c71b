//! # Mapsearch Core
//!
//! Core traits and types for the mapsearch architecture.
//!
//! This crate provides the fundamental abstractions for the map-search
//! application: a reducer-based store that accepts discrete actions,
//! deterministically derives new state, and issues declarative effects
//! that are later fed back into the store as further actions.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature
//! - **Action**: All possible inputs to a reducer (user input, service
//!   callbacks, timers)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected service capabilities via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment
//!
//! ## Service Boundaries
//!
//! The application core never talks to a map SDK, the OS location stack,
//! or the network directly. Each collaborator is a trait the reducer's
//! environment carries:
//!
//! - [`search::CompletionService`] - search-as-you-type suggestion stream
//! - [`search::SearchService`] - resolving a suggestion to real places
//! - [`location::LocationService`] - authorization and device location
//! - [`connectivity::ConnectivityService`] - network path monitoring
//! - [`weather::WeatherService`] - weather lookup for a map region
//!
//! ## Example
//!
//! ```ignore
//! use mapsearch_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for SearchReducer {
//!     type State = SearchState;
//!     type Action = SearchAction;
//!     type Environment = SearchEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut SearchState,
//!         action: SearchAction,
//!         env: &SearchEnvironment,
//!     ) -> SmallVec<[Effect<SearchAction>; 4]> {
//!         // Business logic goes here
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

pub mod connectivity;
pub mod effect;
mod effect_macros;
pub mod environment;
pub mod geo;
pub mod location;
pub mod reducer;
pub mod search;
pub mod weather;
