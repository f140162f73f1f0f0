//! The client controller: one operation per user action.

use taskly_core::api::CurrentUserResponse;
use taskly_core::{Task, TaskId, ValidationErrors, authorize};

use crate::api::{ClientError, TaskApi};
use crate::forms::{LoginForm, RegisterForm, TaskForm};
use crate::routes::Route;
use crate::session::Session;
use crate::storage::{Storage, StorageError};
use crate::table::TaskTable;

/// Outcome of an action that needs a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLoad<T> {
    Ready(T),
    /// The session is gone. Navigate instead of rendering.
    Redirect(Route),
}

/// An error shown inline next to the form or page that caused it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("{}", .0.summary())]
    Fields(ValidationErrors),
    #[error("{0}")]
    Message(String),
}

impl From<ClientError> for ViewError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation(errors) => ViewError::Fields(errors),
            other => ViewError::Message(other.to_string()),
        }
    }
}

impl From<StorageError> for ViewError {
    fn from(err: StorageError) -> Self {
        ViewError::Message(err.to_string())
    }
}

/// A read-only task view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetail {
    pub task: Task,
    pub can_edit: bool,
}

/// A delete that the user has asked for but not yet confirmed.
///
/// Only [`TasklyApp::request_delete`] creates one, so no delete call can be
/// made without going through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    task_id: TaskId,
    title: String,
}

impl DeleteConfirmation {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn prompt(&self) -> String {
        format!("Delete task \"{}\"?", self.title)
    }
}

pub struct TasklyApp<A: TaskApi, S: Storage> {
    api: A,
    session: Session<S>,
}

impl<A: TaskApi, S: Storage> TasklyApp<A, S> {
    pub fn new(api: A, session: Session<S>) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Signs in. On failure the session is left untouched and no navigation happens.
    pub async fn login(&mut self, form: &LoginForm) -> Result<Route, ViewError> {
        form.validate().map_err(ViewError::Fields)?;
        let response = self.api.login(&form.to_request()).await?;
        self.session.set_session(response.user, response.token)?;
        Ok(Route::Tasks)
    }

    pub async fn register(&mut self, form: &RegisterForm) -> Result<Route, ViewError> {
        form.validate().map_err(ViewError::Fields)?;
        let response = self.api.register(&form.to_request()).await?;
        self.session.set_session(response.user, response.token)?;
        Ok(Route::Tasks)
    }

    /// Signs out locally even when the service call fails.
    pub async fn logout(&mut self) -> Result<Route, ViewError> {
        if let Some(token) = self.token() {
            if let Err(err) = self.api.logout(&token).await {
                tracing::warn!("Logout request failed: {}", err);
            }
        }
        self.session.clear_session()?;
        Ok(Route::Login)
    }

    pub async fn load_tasks(&mut self) -> Result<PageLoad<TaskTable>, ViewError> {
        let Some(token) = self.token() else {
            return Ok(PageLoad::Redirect(Route::Login));
        };
        let result = self.api.list_tasks(&token).await;
        let viewer = self.session.current_user().map(|user| user.id);
        self.settle(result.map(|tasks| TaskTable::new(tasks, viewer)))
    }

    pub async fn load_task(&mut self, id: TaskId) -> Result<PageLoad<TaskDetail>, ViewError> {
        let Some(token) = self.token() else {
            return Ok(PageLoad::Redirect(Route::Login));
        };
        let result = self.api.get_task(&token, id).await;
        let viewer = self.session.current_user().map(|user| user.id);
        self.settle(result.map(|task| TaskDetail {
            can_edit: viewer.is_some_and(|viewer| authorize(viewer, &task)),
            task,
        }))
    }

    pub async fn load_profile(&mut self) -> Result<PageLoad<CurrentUserResponse>, ViewError> {
        let Some(token) = self.token() else {
            return Ok(PageLoad::Redirect(Route::Login));
        };
        let result = self.api.current_user(&token).await;
        self.settle(result)
    }

    pub async fn create_task(&mut self, form: &TaskForm) -> Result<PageLoad<Task>, ViewError> {
        let Some(token) = self.token() else {
            return Ok(PageLoad::Redirect(Route::Login));
        };
        form.validate().map_err(ViewError::Fields)?;
        let result = self.api.create_task(&token, &form.to_create_request()).await;
        self.settle(result)
    }

    pub async fn update_task(
        &mut self,
        id: TaskId,
        form: &TaskForm,
    ) -> Result<PageLoad<Task>, ViewError> {
        let Some(token) = self.token() else {
            return Ok(PageLoad::Redirect(Route::Login));
        };
        form.validate().map_err(ViewError::Fields)?;
        let result = self
            .api
            .update_task(&token, id, &form.to_update_request())
            .await;
        self.settle(result)
    }

    /// Starts the delete flow for a task the current user owns.
    pub fn request_delete(&self, task: &Task) -> Result<DeleteConfirmation, ViewError> {
        let owns = self
            .session
            .current_user()
            .is_some_and(|user| authorize(user.id, task));
        if !owns {
            return Err(ViewError::Message(
                "This action is unauthorized.".to_string(),
            ));
        }
        Ok(DeleteConfirmation {
            task_id: task.id,
            title: task.title.clone(),
        })
    }

    /// Issues the delete. Returns the service's confirmation message.
    pub async fn confirm_delete(
        &mut self,
        confirmation: DeleteConfirmation,
    ) -> Result<PageLoad<String>, ViewError> {
        let Some(token) = self.token() else {
            return Ok(PageLoad::Redirect(Route::Login));
        };
        let result = self.api.delete_task(&token, confirmation.task_id).await;
        self.settle(result.map(|response| response.message))
    }

    fn token(&self) -> Option<String> {
        self.session.token().map(str::to_string)
    }

    /// A rejected token ends the session and redirects to login.
    fn settle<T>(&mut self, result: Result<T, ClientError>) -> Result<PageLoad<T>, ViewError> {
        match result {
            Ok(value) => Ok(PageLoad::Ready(value)),
            Err(ClientError::Unauthorized(_)) => {
                tracing::info!("Token rejected, signing out");
                self.session.clear_session()?;
                Ok(PageLoad::Redirect(Route::Login))
            }
            Err(err) => Err(err.into()),
        }
    }
}
