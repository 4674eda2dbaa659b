//! Collaborators the editor calls out to: identity and navigation.

use checkpoint_editor_core::{ChainId, UserId};
use parking_lot::Mutex;

/// Supplies the signed-in user, if any.
pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// Fixed identity, handy for tools and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<UserId>);

impl StaticIdentity {
    pub fn signed_in(user: impl Into<UserId>) -> Self {
        Self(Some(user.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl Identity for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}

/// Destinations the editor can leave to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The signed-in user's chain list.
    MyChains,
    /// Read-only view of a chain.
    ChainView(ChainId),
    /// Edit page of a chain.
    ChainEdit(ChainId),
}

impl Route {
    /// Path form used by the web front end.
    pub fn path(&self) -> String {
        match self {
            Route::MyChains => "/my-checkpoints".to_string(),
            Route::ChainView(id) => format!("/checkpoint/{id}"),
            Route::ChainEdit(id) => format!("/checkpoint/{id}/edit"),
        }
    }
}

/// Page navigation.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that just remembers where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn visited(&self) -> Vec<Route> {
        self.visited.lock().clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.visited.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(path = %route.path(), "navigate");
        self.visited.lock().push(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        let id = ChainId::new("abc");
        assert_eq!(Route::MyChains.path(), "/my-checkpoints");
        assert_eq!(Route::ChainView(id.clone()).path(), "/checkpoint/abc");
        assert_eq!(Route::ChainEdit(id).path(), "/checkpoint/abc/edit");
    }

    #[test]
    fn test_static_identity() {
        assert_eq!(StaticIdentity::anonymous().current_user(), None);
        assert_eq!(
            StaticIdentity::signed_in("u1").current_user(),
            Some(UserId::new("u1"))
        );
    }
}
