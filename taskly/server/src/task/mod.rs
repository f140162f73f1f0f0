use crate::auth::now;
use crate::entities::*;
use sea_orm::*;
use std::sync::Arc;
use taskly_core::validation::{validate_new_task, validate_task_patch};
use taskly_core::{
    NewTaskFields, Task, TaskId, TaskPatchFields, UserId, ValidationErrors, authorize,
};

pub mod api;

/// Shared state for the task routes.
#[derive(Clone)]
pub struct TaskState {
    pub db: Arc<DatabaseConnection>,
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The request payload failed field validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    /// No task has the given ID.
    #[error("Task {0} not found.")]
    NotFound(TaskId),
    /// The requester does not own the task.
    #[error("User {requester} may not modify task {task_id}")]
    Forbidden { task_id: TaskId, requester: UserId },
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

pub struct TaskService<'a> {
    db: &'a DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &DatabaseConnection) -> TaskService<'_> {
        TaskService { db }
    }

    /// Retrieves every task with its owner embedded, ordered by ID.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = task::Entity::find()
            .find_also_related(user::Entity)
            .order_by_asc(task::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(|(model, owner)| with_owner(model, owner))
            .collect();
        Ok(tasks)
    }

    /// Creates a task owned by `requester`.
    ///
    /// # Arguments
    ///
    /// * `fields` - The raw request fields, validated before anything is written.
    /// * `requester` - The authenticated user, who becomes the owner.
    ///
    /// # Returns
    ///
    /// The created task, or `Validation` without touching the database.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(
        &self,
        fields: &NewTaskFields,
        requester: UserId,
    ) -> Result<Task, TaskServiceError> {
        let new_task = validate_new_task(fields).map_err(TaskServiceError::Validation)?;

        let timestamp = now();
        let active_model = task::ActiveModel {
            title: ActiveValue::Set(new_task.title),
            description: ActiveValue::Set(new_task.description),
            status: ActiveValue::Set(new_task.status.into()),
            due_date: ActiveValue::Set(new_task.due_date),
            created_at: ActiveValue::Set(timestamp),
            updated_at: ActiveValue::Set(timestamp),
            user_id: ActiveValue::Set(requester),
            ..Default::default()
        };
        let created = active_model.insert(self.db).await?;
        tracing::info!(task_id = created.id, owner = requester, "Created task");

        self.get_task(created.id).await
    }

    /// Retrieves a task by its ID. Reading is not restricted to the owner.
    #[tracing::instrument(skip(self))]
    pub async fn get_task(&self, id: TaskId) -> Result<Task, TaskServiceError> {
        let (model, owner) = task::Entity::find_by_id(id)
            .find_also_related(user::Entity)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::NotFound(id))?;
        Ok(with_owner(model, owner))
    }

    /// Applies a partial update to a task owned by `requester`.
    ///
    /// Ownership is checked before the fields are validated, so a non-owner is
    /// refused whatever they sent.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &self,
        id: TaskId,
        fields: &TaskPatchFields,
        requester: UserId,
    ) -> Result<Task, TaskServiceError> {
        let existing = self.find_owned(id, requester).await?;
        let patch = validate_task_patch(fields).map_err(TaskServiceError::Validation)?;

        if patch.is_empty() {
            return self.get_task(id).await;
        }

        let mut active_model: task::ActiveModel = existing.into();
        if let Some(title) = patch.title {
            active_model.title = ActiveValue::Set(title);
        }
        if let Some(description) = patch.description {
            active_model.description = ActiveValue::Set(description);
        }
        if let Some(due_date) = patch.due_date {
            active_model.due_date = ActiveValue::Set(due_date);
        }
        if let Some(status) = patch.status {
            active_model.status = ActiveValue::Set(status.into());
        }
        active_model.updated_at = ActiveValue::Set(now());
        // No version check: concurrent updates are last-writer-wins.
        active_model
            .update(self.db)
            .await
            .map_err(|err| update_error(id, err))?;

        self.get_task(id).await
    }

    /// Deletes a task owned by `requester`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: TaskId, requester: UserId) -> Result<(), TaskServiceError> {
        self.find_owned(id, requester).await?;
        task::Entity::delete_by_id(id).exec(self.db).await?;
        tracing::info!(task_id = id, "Deleted task");
        Ok(())
    }

    /// Fails unless the task exists and `requester` owns it.
    pub async fn ensure_owner(
        &self,
        id: TaskId,
        requester: UserId,
    ) -> Result<(), TaskServiceError> {
        self.find_owned(id, requester).await.map(|_| ())
    }

    /// Loads a task and checks that `requester` owns it.
    async fn find_owned(
        &self,
        id: TaskId,
        requester: UserId,
    ) -> Result<task::Model, TaskServiceError> {
        let model = task::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::NotFound(id))?;

        if !authorize(requester, &model) {
            tracing::warn!(task_id = id, requester, "Refused modification by non-owner");
            return Err(TaskServiceError::Forbidden {
                task_id: id,
                requester,
            });
        }
        Ok(model)
    }
}

/// A task deleted after the ownership check leaves no row to update.
fn update_error(id: TaskId, err: DbErr) -> TaskServiceError {
    match err {
        DbErr::RecordNotUpdated => TaskServiceError::NotFound(id),
        err => TaskServiceError::Database(err),
    }
}

fn with_owner(model: task::Model, owner: Option<user::Model>) -> Task {
    // The foreign key cascades, so a task without an owner row cannot be read back.
    let owner_name = owner.map(|owner| owner.name).unwrap_or_default();
    model.into_task(owner_name)
}
