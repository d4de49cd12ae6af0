use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::session::Session;

pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";

/// A navigable route and its guard metadata.
#[derive(Debug, Clone)]
pub struct RouteDef {
    pub path: &'static str,
    pub requires_auth: bool,
}

impl RouteDef {
    const fn open(path: &'static str) -> Self {
        Self {
            path,
            requires_auth: false,
        }
    }

    const fn guarded(path: &'static str) -> Self {
        Self {
            path,
            requires_auth: true,
        }
    }
}

pub fn default_routes() -> Vec<RouteDef> {
    vec![
        RouteDef::open(HOME_ROUTE),
        RouteDef::open("/about"),
        RouteDef::open(LOGIN_ROUTE),
        RouteDef::open("/registration"),
        RouteDef::guarded("/matches"),
        RouteDef::guarded("/messages"),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    RedirectToLogin,
}

/// The route guard itself: a pure function of the target's metadata and
/// whether a user is present.
pub fn guard(requires_auth: bool, authenticated: bool) -> GuardDecision {
    if requires_auth && !authenticated {
        GuardDecision::RedirectToLogin
    } else {
        GuardDecision::Proceed
    }
}

/// Tracks the current route and applies the guard on every navigation.
/// Shares the session state with the [`SessionStore`](crate::services::session_store::SessionStore)
/// so guarding always sees the latest authentication state.
pub struct Router {
    routes: Vec<RouteDef>,
    current: RwLock<String>,
    session: Arc<RwLock<Session>>,
}

impl Router {
    pub fn new(session: Arc<RwLock<Session>>) -> Self {
        Self::with_routes(default_routes(), session)
    }

    pub fn with_routes(routes: Vec<RouteDef>, session: Arc<RwLock<Session>>) -> Self {
        Self {
            routes,
            current: RwLock::new(HOME_ROUTE.to_string()),
            session,
        }
    }

    pub async fn current(&self) -> String {
        self.current.read().await.clone()
    }

    /// Navigates to `path`, redirecting to the login route when the guard
    /// rejects it. Returns the path actually landed on. Paths outside the
    /// route table carry no guard metadata and proceed unchecked.
    pub async fn push(&self, path: &str) -> String {
        let requires_auth = self
            .routes
            .iter()
            .find(|route| route.path == path)
            .map(|route| route.requires_auth)
            .unwrap_or(false);
        let authenticated = self.session.read().await.is_authenticated();

        let resolved = match guard(requires_auth, authenticated) {
            GuardDecision::Proceed => path.to_string(),
            GuardDecision::RedirectToLogin => {
                tracing::debug!("Redirecting unauthenticated navigation '{}' to login", path);
                LOGIN_ROUTE.to_string()
            }
        };

        *self.current.write().await = resolved.clone();
        resolved
    }
}
