//! Which pages need a session and where to send the visitor otherwise.

use aura_store::record::ACCESS_TOKEN_KEY;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/home";

const PROTECTED_PREFIXES: [&str; 5] = [
    "/home",
    "/profile",
    "/settings",
    "/notifications",
    "/messages",
];
const PUBLIC_PATHS: [&str; 5] = [
    "/",
    "/login",
    "/register",
    "/forgot-password",
    "/reset-password",
];

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum RouteDecision {
    Continue,
    RedirectToLogin { from: String },
    RedirectHome,
}

impl RouteDecision {
    /// Target of the redirect, if any.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            RouteDecision::Continue => None,
            RouteDecision::RedirectHome => Some(HOME_PATH.to_owned()),
            RouteDecision::RedirectToLogin { from } => Some(login_location(from)),
        }
    }
}

fn login_location(from: &str) -> String {
    match Url::parse_with_params("http://localhost/login", [("from", from)]) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
        Err(_) => LOGIN_PATH.to_owned(),
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct RouteGuard {
    protected_prefixes: Vec<String>,
    public_paths: Vec<String>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            protected_prefixes: PROTECTED_PREFIXES.map(str::to_owned).to_vec(),
            public_paths: PUBLIC_PATHS.map(str::to_owned).to_vec(),
        }
    }
}

impl RouteGuard {
    #[must_use]
    pub fn new(protected_prefixes: Vec<String>, public_paths: Vec<String>) -> Self {
        Self {
            protected_prefixes,
            public_paths,
        }
    }

    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|public| public == path)
    }

    #[must_use]
    pub fn decide(&self, path: &str, has_token: bool) -> RouteDecision {
        if !has_token && self.is_protected(path) {
            RouteDecision::RedirectToLogin {
                from: path.to_owned(),
            }
        } else if has_token && self.is_public(path) {
            RouteDecision::RedirectHome
        } else {
            RouteDecision::Continue
        }
    }
}

/// Middleware for [`axum::middleware::from_fn_with_state`]. The session is
/// the `access_token` cookie.
pub async fn require_session(
    State(guard): State<Arc<RouteGuard>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let has_token = jar
        .get(ACCESS_TOKEN_KEY)
        .is_some_and(|cookie| !cookie.value().is_empty());
    let path = request.uri().path();

    match guard.decide(path, has_token).location() {
        Some(location) => {
            debug!(%path, %location, "Redirecting");
            Redirect::temporary(&location).into_response()
        }
        None => next.run(request).await,
    }
}
