//! Lifecycle and state of one interactive map session.
//!
//! A [`MapSession`] owns a single surface and everything attached to it:
//! marker groups, at most one route, and the user-location tracker. All of
//! it is released together by [`MapSession::destroy`].

pub mod config;
pub mod error;
pub mod location;
pub mod session;

pub use config::*;
pub use error::*;
pub use location::*;
pub use session::*;

/// Event kinds recorded on the session's [`runtime::EventBus`].
pub mod event_kinds {
    pub const INIT: &str = "session.init";
    pub const DESTROY: &str = "session.destroy";
    pub const TEARDOWN_FAILURE: &str = "session.teardown_failure";
    pub const LOCATION_ERROR: &str = "location.error";
    pub const REACTION_FAILURE: &str = "session.reaction_failure";
    pub const ROUTE_FAILED: &str = "route.failed";
}
