//! Client-side filtering and sorting of the fetched task list.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use taskly_core::{Task, TaskId, TaskStatus, UserId, authorize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} '{value}'")]
pub struct UnknownOption {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    pub fn matches(&self, status: TaskStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == TaskStatus::Pending,
            StatusFilter::Completed => status == TaskStatus::Completed,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => "all",
            StatusFilter::Pending => "pending",
            StatusFilter::Completed => "completed",
        })
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(UnknownOption {
                kind: "status filter",
                value: other.to_string(),
            }),
        }
    }
}

/// Order of the due date column.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortOrder::Asc => "↑",
            SortOrder::Desc => "↓",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}

impl FromStr for SortOrder {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(UnknownOption {
                kind: "sort order",
                value: other.to_string(),
            }),
        }
    }
}

/// Actions offered on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    View,
    Edit,
    Delete,
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RowAction::View => "view",
            RowAction::Edit => "edit",
            RowAction::Delete => "delete",
        })
    }
}

/// One rendered line of the task table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: NaiveDate,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Whether the viewer owns the task and may edit or delete it.
    pub can_edit: bool,
}

impl TaskRow {
    fn new(task: &Task, viewer: Option<UserId>) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            due_date: task.due_date,
            created_by: task.user.name.clone(),
            created_at: task.created_at,
            can_edit: viewer.is_some_and(|viewer| authorize(viewer, task)),
        }
    }

    pub fn status_badge(&self) -> String {
        status_badge(self.status)
    }

    pub fn actions(&self) -> Vec<RowAction> {
        if self.can_edit {
            vec![RowAction::View, RowAction::Edit, RowAction::Delete]
        } else {
            vec![RowAction::View]
        }
    }
}

/// Upper-case badge text for a status.
pub fn status_badge(status: TaskStatus) -> String {
    status.as_str().to_uppercase()
}

/// The fetched task list plus the viewer's filter and sort choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTable {
    tasks: Vec<Task>,
    viewer: Option<UserId>,
    filter: StatusFilter,
    sort: SortOrder,
}

impl TaskTable {
    pub fn new(tasks: Vec<Task>, viewer: Option<UserId>) -> Self {
        Self {
            tasks,
            viewer,
            filter: StatusFilter::default(),
            sort: SortOrder::default(),
        }
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    pub fn set_sort_order(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    pub fn toggle_sort(&mut self) {
        self.sort = self.sort.toggled();
    }

    /// All fetched tasks, unfiltered and in fetch order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Visible rows: filtered by status, then stably sorted by due date.
    pub fn rows(&self) -> Vec<TaskRow> {
        let mut rows: Vec<TaskRow> = self
            .tasks
            .iter()
            .filter(|task| self.filter.matches(task.status))
            .map(|task| TaskRow::new(task, self.viewer))
            .collect();
        match self.sort {
            SortOrder::Asc => rows.sort_by(|a, b| a.due_date.cmp(&b.due_date)),
            SortOrder::Desc => rows.sort_by(|a, b| b.due_date.cmp(&a.due_date)),
        }
        rows
    }

    /// Drops a deleted task from the local list. Returns whether it was present.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }
}
