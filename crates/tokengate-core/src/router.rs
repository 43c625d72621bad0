//! Route table and login-state navigation guard.
//!
//! Two areas exist: the welcome area at `/` (every route in it is named
//! `welcome-*`) and the authenticated area at `/index`. Before each
//! navigation the guard asks the `TokenStore` whether the user is logged in
//! and may redirect:
//!
//! - a `welcome-*` route while logged in goes to `/index`
//! - anything under `/index` while logged out goes to `/`
//! - everything else proceeds unchanged

use thiserror::Error;
use tracing::debug;

use crate::auth::TokenStore;

pub const HOME_PATH: &str = "/";
pub const INDEX_PATH: &str = "/index";

/// Name prefix shared by all routes of the welcome area
pub const WELCOME_PREFIX: &str = "welcome-";

/// Upper bound on redirects followed by a single navigation
const MAX_REDIRECTS: usize = 4;

#[derive(Debug)]
pub struct Route {
    /// Absolute for top-level routes, relative to the parent for children
    pub path: &'static str,
    pub name: &'static str,
    pub children: &'static [Route],
}

pub static ROUTES: &[Route] = &[
    Route {
        path: "/",
        name: "welcome",
        children: &[Route {
            path: "",
            name: "welcome-login",
            children: &[],
        }],
    },
    Route {
        path: "/index",
        name: "index",
        children: &[],
    },
];

/// A resolved navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Name of the deepest matching route
    pub name: &'static str,
    /// Path without query or fragment
    pub path: String,
    /// Path as requested, query and fragment included
    pub full_path: String,
}

impl Location {
    pub fn is_welcome(&self) -> bool {
        self.name.starts_with(WELCOME_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(&'static str),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouterError {
    #[error("No route matches {0}")]
    NoMatch(String),

    #[error("Too many redirects while navigating to {0}")]
    RedirectLoop(String),
}

fn join(base: &str, segment: &str) -> String {
    if segment.starts_with('/') {
        segment.to_string()
    } else if segment.is_empty() {
        base.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, segment)
    } else {
        format!("{}/{}", base, segment)
    }
}

fn find(routes: &'static [Route], base: &str, path: &str) -> Option<&'static Route> {
    for route in routes {
        let full = join(base, route.path);
        if let Some(child) = find(route.children, &full, path) {
            return Some(child);
        }
        if full == path {
            return Some(route);
        }
    }
    None
}

/// Resolve a requested path against the route table.
pub fn resolve(full_path: &str) -> Option<Location> {
    let path = full_path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let path = match path.trim_end_matches('/') {
        "" => HOME_PATH,
        trimmed => trimmed,
    };
    let route = find(ROUTES, "", path)?;
    Some(Location {
        name: route.name,
        path: path.to_string(),
        full_path: full_path.to_string(),
    })
}

/// Decide what happens to a navigation given the current login state.
pub fn guard(to: &Location, unauthorized: bool) -> Navigation {
    if to.is_welcome() && !unauthorized {
        Navigation::Redirect(INDEX_PATH)
    } else if to.full_path.starts_with(INDEX_PATH) && unauthorized {
        Navigation::Redirect(HOME_PATH)
    } else {
        Navigation::Proceed
    }
}

/// Navigation state with the guard applied on every transition.
pub struct Router {
    tokens: TokenStore,
    current: Option<Location>,
}

impl Router {
    pub fn new(tokens: TokenStore) -> Self {
        Self {
            tokens,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Location> {
        self.current.as_ref()
    }

    /// Navigate to `path`, following guard redirects.
    ///
    /// The login state is read from storage for every guard decision.
    pub fn navigate(&mut self, path: &str) -> Result<&Location, RouterError> {
        let mut target = path.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let location =
                resolve(&target).ok_or_else(|| RouterError::NoMatch(target.clone()))?;
            match guard(&location, self.tokens.is_unauthorized()) {
                Navigation::Proceed => {
                    debug!(requested = path, resolved = %location.full_path, "Navigation committed");
                    let committed: &Location = self.current.insert(location);
                    return Ok(committed);
                }
                Navigation::Redirect(to) => {
                    debug!(from = %location.full_path, to, "Navigation redirected");
                    target = to.to_string();
                }
            }
        }
        Err(RouterError::RedirectLoop(path.to_string()))
    }

    /// Re-run the guard for the current location, e.g. after login or logout.
    pub fn refresh(&mut self) -> Result<&Location, RouterError> {
        let path = self
            .current
            .as_ref()
            .map(|l| l.full_path.clone())
            .unwrap_or_else(|| HOME_PATH.to_string());
        self.navigate(&path)
    }
}
