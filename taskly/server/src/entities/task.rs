use sea_orm::entity::prelude::*;
use taskly_core::{Owned, TaskOwner, TaskStatus, UserId};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: Status,
    pub due_date: Date,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub user_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Status {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl From<TaskStatus> for Status {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => Status::Pending,
            TaskStatus::Completed => Status::Completed,
        }
    }
}

impl From<Status> for TaskStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => TaskStatus::Pending,
            Status::Completed => TaskStatus::Completed,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Owned for Model {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

impl Model {
    /// Converts into the wire representation, embedding the owner.
    pub fn into_task(self, owner_name: String) -> taskly_core::Task {
        taskly_core::Task {
            id: self.id,
            title: self.title,
            description: self.description,
            status: self.status.into(),
            due_date: self.due_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            user_id: self.user_id,
            user: TaskOwner {
                id: self.user_id,
                name: owner_name,
            },
        }
    }
}
