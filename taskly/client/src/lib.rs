//! Client side of Taskly: the HTTP API client, the session context and the
//! views the `taskly` terminal front end renders.

pub mod api;
pub mod app;
pub mod config;
pub mod forms;
pub mod render;
pub mod routes;
pub mod session;
pub mod storage;
pub mod table;

pub use api::{ApiClient, ClientError, TaskApi};
pub use app::{DeleteConfirmation, PageLoad, TaskDetail, TasklyApp, ViewError};
pub use routes::{Route, guard};
pub use session::{Session, SessionState};
pub use storage::{FileStorage, MemoryStorage, Storage};
