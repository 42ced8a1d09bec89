use std::fmt;

use crate::auth::Session;

/// Where the session stands from the guard's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Bootstrap or login in flight.
    Pending,
    Authenticated,
    Unauthenticated,
}

impl From<&Session> for GuardState {
    fn from(s: &Session) -> Self {
        if s.loading {
            GuardState::Pending
        } else if s.authenticated {
            GuardState::Authenticated
        } else {
            GuardState::Unauthenticated
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Root,
    Auth,
    Dashboard,
    Compose,
    Email(String),
    Templates,
    Campaigns,
    Analytics,
    Settings,
}

impl Route {
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        Some(match trimmed {
            "" => Route::Root,
            "/auth" => Route::Auth,
            "/dashboard" => Route::Dashboard,
            "/compose" => Route::Compose,
            "/templates" => Route::Templates,
            "/campaigns" => Route::Campaigns,
            "/analytics" => Route::Analytics,
            "/settings" => Route::Settings,
            other => {
                let id = other.strip_prefix("/email/")?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                Route::Email(id.to_string())
            }
        })
    }

    pub fn path(&self) -> String {
        match self {
            Route::Root => "/".into(),
            Route::Auth => "/auth".into(),
            Route::Dashboard => "/dashboard".into(),
            Route::Compose => "/compose".into(),
            Route::Email(id) => format!("/email/{id}"),
            Route::Templates => "/templates".into(),
            Route::Campaigns => "/campaigns".into(),
            Route::Analytics => "/analytics".into(),
            Route::Settings => "/settings".into(),
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Root | Route::Auth)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// What the view layer should do with a requested route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    /// Show a placeholder and issue no data requests.
    Loading,
    /// Replace the requested route with another one.
    Redirect(Route),
}

pub fn resolve(state: GuardState, route: Route) -> Navigation {
    match (route, state) {
        (Route::Root, _) => Navigation::Redirect(Route::Dashboard),
        (Route::Auth, GuardState::Authenticated) => Navigation::Redirect(Route::Dashboard),
        (Route::Auth, _) => Navigation::Render(Route::Auth),
        (_, GuardState::Pending) => Navigation::Loading,
        (_, GuardState::Unauthenticated) => Navigation::Redirect(Route::Auth),
        (route, GuardState::Authenticated) => Navigation::Render(route),
    }
}

/// Follows redirects until something renders or is loading.
pub fn settle(state: GuardState, route: Route) -> Navigation {
    let mut nav = resolve(state, route);
    // at most Root -> Dashboard -> Auth
    for _ in 0..3 {
        match nav {
            Navigation::Redirect(next) => nav = resolve(state, next),
            _ => break,
        }
    }
    nav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_paths() {
        assert_eq!(Route::parse("/"), Some(Route::Root));
        assert_eq!(Route::parse("/dashboard/"), Some(Route::Dashboard));
        assert_eq!(Route::parse("/auth#session_id=abc"), Some(Route::Auth));
        assert_eq!(Route::parse("/email/e1"), Some(Route::Email("e1".into())));
        assert_eq!(Route::parse("/email/"), None);
        assert_eq!(Route::parse("/email/a/b"), None);
        assert_eq!(Route::parse("/nowhere"), None);
    }

    #[test]
    fn path_round_trips() {
        for r in [Route::Compose, Route::Email("x1".into()), Route::Settings] {
            assert_eq!(Route::parse(&r.path()), Some(r));
        }
    }

    #[test]
    fn pending_protected_route_shows_placeholder() {
        assert_eq!(resolve(GuardState::Pending, Route::Templates), Navigation::Loading);
        assert_eq!(resolve(GuardState::Pending, Route::Auth), Navigation::Render(Route::Auth));
    }

    #[test]
    fn unauthenticated_protected_route_goes_to_auth() {
        assert_eq!(
            resolve(GuardState::Unauthenticated, Route::Email("e1".into())),
            Navigation::Redirect(Route::Auth)
        );
        assert_eq!(settle(GuardState::Unauthenticated, Route::Root), Navigation::Render(Route::Auth));
    }

    #[test]
    fn authenticated_renders_and_skips_auth_page() {
        assert_eq!(
            resolve(GuardState::Authenticated, Route::Campaigns),
            Navigation::Render(Route::Campaigns)
        );
        assert_eq!(
            resolve(GuardState::Authenticated, Route::Auth),
            Navigation::Redirect(Route::Dashboard)
        );
        assert_eq!(
            settle(GuardState::Authenticated, Route::Root),
            Navigation::Render(Route::Dashboard)
        );
    }

    #[test]
    fn guard_state_from_session() {
        let mut s = Session {
            loading: true,
            ..Session::default()
        };
        assert_eq!(GuardState::from(&s), GuardState::Pending);
        s.loading = false;
        assert_eq!(GuardState::from(&s), GuardState::Unauthenticated);
        s.authenticated = true;
        assert_eq!(GuardState::from(&s), GuardState::Authenticated);
    }
}
