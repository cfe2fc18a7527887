//! Role-gated routing: which top-level screen a session snapshot shows.

use lms_types::{Role, Session};
use strum::{Display, EnumIter};
use tokio::sync::watch;

use crate::actor::ActorError;

/// Tabs of the admin home screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum AdminTab {
    #[default]
    Summary,
    Librarians,
    Members,
    Library,
}

/// Top-level screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Authentication or role resolution in flight.
    Loading,
    /// Sign-in / sign-up forms.
    Onboarding,
    Admin(AdminTab),
    Librarian,
    Member,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Loading => write!(f, "loading"),
            Route::Onboarding => write!(f, "onboarding"),
            Route::Admin(tab) => write!(f, "admin home ({tab})"),
            Route::Librarian => write!(f, "librarian home"),
            Route::Member => write!(f, "member home"),
        }
    }
}

/// Pure routing decision. Admin screens open on the summary tab.
///
/// Loading wins over everything so a half-resolved role is never rendered.
pub fn route(session: &Session) -> Route {
    if session.loading {
        return Route::Loading;
    }
    if !session.authenticated {
        return Route::Onboarding;
    }
    match session.role {
        Role::Admin => Route::Admin(AdminTab::default()),
        Role::Librarian => Route::Librarian,
        Role::User => Route::Member,
    }
}

/// Follows session snapshots and remembers the selected admin tab.
pub struct Router {
    state: watch::Receiver<Session>,
    admin_tab: AdminTab,
}

impl Router {
    pub fn new(state: watch::Receiver<Session>) -> Self {
        Self {
            state,
            admin_tab: AdminTab::default(),
        }
    }

    pub fn current(&self) -> Route {
        match route(&self.state.borrow()) {
            Route::Admin(_) => Route::Admin(self.admin_tab),
            other => other,
        }
    }

    /// Switch admin tabs. Ignored outside the admin home.
    pub fn select_tab(&mut self, tab: AdminTab) -> Route {
        if matches!(self.current(), Route::Admin(_)) {
            self.admin_tab = tab;
        }
        self.current()
    }

    /// Wait for the next published snapshot and route it.
    ///
    /// Leaving the admin home forgets the selected tab.
    pub async fn changed(&mut self) -> Result<Route, ActorError> {
        self.state.changed().await.map_err(|_| ActorError::Shutdown)?;
        let route = self.current();
        if !matches!(route, Route::Admin(_) | Route::Loading) {
            self.admin_tab = AdminTab::default();
        }
        Ok(route)
    }
}
