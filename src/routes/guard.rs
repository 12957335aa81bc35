//! Navigation guard. A pure function of the session status and the requested
//! route; it never performs I/O. This is UX gating only, the API enforces
//! real access control.

use super::{Access, Route};
use crate::session::Status;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session state is not known yet; render a neutral placeholder.
    Wait,
    Allow,
    Redirect {
        to: Route,
        /// Originally requested path, so login can return there.
        from: Option<String>,
    },
}

#[must_use]
pub fn evaluate(status: Status, route: &Route) -> GuardDecision {
    if *route == Route::Root {
        return GuardDecision::Redirect {
            to: Route::Login,
            from: None,
        };
    }

    match (status, route.access()) {
        (_, Access::Open) => GuardDecision::Allow,
        (Status::Unknown | Status::Loading, _) => GuardDecision::Wait,
        (Status::Authenticated, Access::Protected)
        | (Status::Unauthenticated, Access::PublicOnly) => GuardDecision::Allow,
        (Status::Authenticated, Access::PublicOnly) => GuardDecision::Redirect {
            to: Route::Dashboard,
            from: None,
        },
        (Status::Unauthenticated, Access::Protected) => GuardDecision::Redirect {
            to: Route::Login,
            from: Some(route.path().to_string()),
        },
    }
}
