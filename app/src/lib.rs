//! # Mapsearch App
//!
//! The map-search feature built on the mapsearch architecture: one
//! aggregate [`AppState`], one closed [`AppAction`] sum, and the
//! [`AppReducer`] encoding all interaction logic - query changes,
//! completion selection, region settling with a debounced weather
//! refetch, the location-permission state machine, and connectivity
//! tracking.
//!
//! The feature owns no I/O. Every collaborator (completer, place
//! search, location manager, path monitor, weather lookup) is a trait
//! object in [`AppEnvironment`], so production adapters and the
//! deterministic doubles from `mapsearch-testing` are interchangeable.

pub mod environment;
pub mod reducer;
pub mod types;

pub use environment::AppEnvironment;
pub use reducer::{AppReducer, effect_ids};
pub use types::{Alert, AppAction, AppState};
