//! Form state with advisory pre-validation.
//!
//! The checks reuse the rules the service applies, so a form that passes
//! here is only rejected by the service for reasons the client cannot see,
//! such as a taken email.

use taskly_core::api::{CreateTaskRequest, LoginRequest, RegisterRequest, UpdateTaskRequest};
use taskly_core::validation::{
    Credentials, NewTask, Registration, validate_login, validate_new_task, validate_registration,
};
use taskly_core::{Task, TaskStatus, ValidationErrors};

/// The create and edit form of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    /// As typed, `YYYY-MM-DD`.
    pub due_date: String,
    pub status: TaskStatus,
}

impl TaskForm {
    /// The edit form, prefilled from an existing task.
    pub fn for_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date.format("%Y-%m-%d").to_string(),
            status: task.status,
        }
    }

    fn fields(&self) -> CreateTaskRequest {
        CreateTaskRequest {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            due_date: Some(self.due_date.clone()),
            status: Some(self.status.as_str().to_string()),
        }
    }

    pub fn validate(&self) -> Result<NewTask, ValidationErrors> {
        validate_new_task(&self.fields())
    }

    pub fn to_create_request(&self) -> CreateTaskRequest {
        self.fields()
    }

    /// Edits submit every field of the form.
    pub fn to_update_request(&self) -> UpdateTaskRequest {
        let fields = self.fields();
        UpdateTaskRequest {
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            status: fields.status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn to_request(&self) -> LoginRequest {
        LoginRequest {
            email: Some(self.email.clone()),
            password: Some(self.password.clone()),
        }
    }

    pub fn validate(&self) -> Result<Credentials, ValidationErrors> {
        validate_login(&self.to_request())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl RegisterForm {
    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            name: Some(self.name.clone()),
            email: Some(self.email.clone()),
            password: Some(self.password.clone()),
            password_confirmation: Some(self.password_confirmation.clone()),
        }
    }

    pub fn validate(&self) -> Result<Registration, ValidationErrors> {
        validate_registration(&self.to_request())
    }
}
