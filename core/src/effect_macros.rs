//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants from
//! async blocks and timers.

/// Create an `Effect::Future` from an async block
///
/// The block must evaluate to `Option<Action>`; `None` makes the effect
/// fire-and-forget.
///
/// # Example
///
/// ```rust,ignore
/// use mapsearch_core::async_effect;
///
/// async_effect! {
///     let response = search.resolve(candidate).await;
///     Some(AppAction::SearchResponse(response))
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use mapsearch_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(30),
///     action: AppAction::TimeoutExpired
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
