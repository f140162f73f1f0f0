//! Plain-text rendering of client views through askama templates.

use askama::Template;
use taskly_core::api::CurrentUserResponse;
use taskly_core::{Task, ValidationErrors};

use crate::app::{TaskDetail, ViewError};
use crate::table::{TaskRow, TaskTable, status_badge};

const DESCRIPTION_PREVIEW_CHARS: usize = 60;

/// Shortens `text` to at most `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

struct RowView {
    id: i32,
    badge: String,
    title: String,
    description: String,
    due_date: String,
    created_by: String,
    created_at: String,
    actions: String,
}

impl From<TaskRow> for RowView {
    fn from(row: TaskRow) -> Self {
        let actions = row
            .actions()
            .iter()
            .map(|action| action.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            id: row.id,
            badge: row.status_badge(),
            title: row.title,
            description: truncate(&row.description, DESCRIPTION_PREVIEW_CHARS),
            due_date: row.due_date.format("%Y-%m-%d").to_string(),
            created_by: row.created_by,
            created_at: row.created_at.format("%Y-%m-%d").to_string(),
            actions,
        }
    }
}

#[derive(Template)]
#[template(path = "task_list.txt")]
struct TaskListTemplate {
    filter: String,
    arrow: &'static str,
    rows: Vec<RowView>,
}

#[derive(Template)]
#[template(path = "task_detail.txt")]
struct TaskDetailTemplate<'a> {
    task: &'a Task,
    badge: String,
    can_edit: bool,
}

#[derive(Template)]
#[template(path = "profile.txt")]
struct ProfileTemplate<'a> {
    profile: &'a CurrentUserResponse,
    rows: Vec<RowView>,
}

#[derive(Template)]
#[template(path = "error.txt")]
struct ErrorTemplate {
    message: String,
    /// One `(field, message)` pair per line.
    lines: Vec<(String, String)>,
}

pub fn render_task_list(table: &TaskTable) -> Result<String, askama::Error> {
    TaskListTemplate {
        filter: table.filter().to_string(),
        arrow: table.sort_order().arrow(),
        rows: table.rows().into_iter().map(RowView::from).collect(),
    }
    .render()
}

pub fn render_task_detail(detail: &TaskDetail) -> Result<String, askama::Error> {
    TaskDetailTemplate {
        task: &detail.task,
        badge: status_badge(detail.task.status),
        can_edit: detail.can_edit,
    }
    .render()
}

pub fn render_profile(profile: &CurrentUserResponse) -> Result<String, askama::Error> {
    // Every task on the profile belongs to the viewer.
    let table = TaskTable::new(profile.tasks.clone(), Some(profile.user.id));
    ProfileTemplate {
        profile,
        rows: table.rows().into_iter().map(RowView::from).collect(),
    }
    .render()
}

pub fn render_error(error: &ViewError) -> Result<String, askama::Error> {
    let no_fields = ValidationErrors::new();
    let errors = match error {
        ViewError::Fields(errors) => errors,
        ViewError::Message(_) => &no_fields,
    };
    let lines = errors
        .iter()
        .flat_map(|(field, messages)| {
            messages
                .iter()
                .map(move |message| (field.to_string(), message.clone()))
        })
        .collect();
    ErrorTemplate {
        message: error.to_string(),
        lines,
    }
    .render()
}
