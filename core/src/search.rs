//! Place search and search-completion boundaries.
//!
//! Two capabilities cover the search flow:
//!
//! - [`CompletionService`]: a search-as-you-type completer. The consumer
//!   subscribes once to an infinite stream of suggestion batches, then
//!   pushes query fragments at it; each fragment eventually produces a
//!   fresh batch on the stream.
//! - [`SearchService`]: resolves a chosen suggestion to concrete places
//!   with coordinates and a bounding region.
//!
//! # Dyn Compatibility
//!
//! These traits use explicit `Pin<Box<dyn Future>>` / boxed stream
//! returns instead of `async fn` to enable trait object usage
//! (`Arc<dyn CompletionService>`). This is required for the effect
//! system where reducers create effects that capture the service.

use crate::geo::{Coordinate, Region};
use futures::stream::BoxStream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors produced by the search boundaries.
///
/// All failures are recoverable: the reducer receives them as
/// failure-tagged actions and decides what, if anything, to surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The underlying search provider failed.
    #[error("search service failed: {0}")]
    Service(String),
}

/// A single search-as-you-type suggestion.
///
/// Identity is the `(title, subtitle)` pair - two candidates with the
/// same title and subtitle are the same entity; there is no synthetic id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompletionCandidate {
    /// Primary display line, e.g. a place name
    pub title: String,
    /// Secondary display line, e.g. "Search Nearby"
    pub subtitle: String,
}

impl CompletionCandidate {
    /// Create a candidate from its display lines
    #[must_use]
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }
}

/// A place produced by resolving a completion candidate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedPlace {
    /// Where the place is
    pub coordinate: Coordinate,
    /// Human-readable name
    pub display_name: String,
    /// Provider-specific extras (phone, url, ...), opaque to the core
    pub metadata: Vec<(String, String)>,
}

impl ResolvedPlace {
    /// Create a place with no metadata
    #[must_use]
    pub fn new(coordinate: Coordinate, display_name: impl Into<String>) -> Self {
        Self {
            coordinate,
            display_name: display_name.into(),
            metadata: Vec::new(),
        }
    }

    /// Attach a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

/// The outcome of resolving a completion candidate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResponse {
    /// Region enclosing all returned places
    pub bounding_region: Region,
    /// Matching places, provider ranking order
    pub places: Vec<ResolvedPlace>,
}

/// Search-as-you-type completion capability.
pub trait CompletionService: Send + Sync {
    /// Subscribe to completion batches.
    ///
    /// The stream is infinite and restartable per subscription: it ends
    /// only when the subscription is cancelled. Each batch replaces the
    /// previous one wholesale; errors are delivered in-band and do not
    /// terminate the stream.
    fn completions(&self) -> BoxStream<'static, Result<Vec<CompletionCandidate>, SearchError>>;

    /// Update the query fragment the completer is working on.
    ///
    /// Fire-and-forget: results arrive on the [`Self::completions`]
    /// stream, not here.
    fn set_query(&self, query: String) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Resolution of a suggestion to concrete places.
pub trait SearchService: Send + Sync {
    /// Resolve a candidate to places with coordinates.
    ///
    /// Produces exactly one value, success or failure.
    fn resolve(
        &self,
        candidate: CompletionCandidate,
    ) -> Pin<Box<dyn Future<Output = Result<SearchResponse, SearchError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_identity_is_title_and_subtitle() {
        let a = CompletionCandidate::new("Apple Store", "Search Nearby");
        let b = CompletionCandidate::new("Apple Store", "Search Nearby");
        let c = CompletionCandidate::new("Apple Store", "Downtown");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn place_metadata_builder() {
        let place = ResolvedPlace::new(Coordinate::new(0.0, 0.0), "Apple Store")
            .with_metadata("phone", "+1 555 0100");

        assert_eq!(place.display_name, "Apple Store");
        assert_eq!(place.metadata, vec![("phone".to_string(), "+1 555 0100".to_string())]);
    }
}
