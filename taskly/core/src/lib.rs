//! Core domain models and rules for Taskly.
//!
//! Shared by the REST service and its clients so both sides agree on what a
//! valid task looks like and who may change it.
#[cfg(feature = "serde")]
pub mod api;
pub mod authorization;
pub mod task;
pub mod user;
pub mod validation;

pub use authorization::{Owned, authorize};
pub use task::{Task, TaskId, TaskOwner, TaskStatus};
pub use user::{User, UserId};
pub use validation::{
    NewTask, NewTaskFields, Registration, RegistrationFields, TaskPatch, TaskPatchFields,
    ValidationErrors,
};
