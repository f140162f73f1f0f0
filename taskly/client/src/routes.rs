use std::fmt;
use taskly_core::TaskId;

use crate::session::Session;
use crate::storage::Storage;

/// Navigable views of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tasks,
    AddTask,
    ShowTask(TaskId),
    EditTask(TaskId),
    Profile,
    Login,
    Register,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Tasks => "/".to_string(),
            Route::AddTask => "/tasks/add".to_string(),
            Route::ShowTask(id) => format!("/tasks/{}", id),
            Route::EditTask(id) => format!("/tasks/{}/edit", id),
            Route::Profile => "/profile".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
        }
    }

    /// Resolves a path to a route. Unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            [""] => Some(Route::Tasks),
            ["tasks", "add"] => Some(Route::AddTask),
            ["tasks", id] => id.parse().ok().map(Route::ShowTask),
            ["tasks", id, "edit"] => id.parse().ok().map(Route::EditTask),
            ["profile"] => Some(Route::Profile),
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            _ => None,
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Returns the route that should actually be shown for `requested`.
///
/// Anonymous users only reach login and register. Signed-in users are sent
/// from those to the task list.
pub fn guard<S: Storage>(requested: Route, session: &Session<S>) -> Route {
    match (session.is_authenticated(), requested.requires_auth()) {
        (false, true) => Route::Login,
        (true, false) => Route::Tasks,
        _ => requested,
    }
}
