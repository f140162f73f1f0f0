use common::{insert_user, setup_db};
use sea_orm::{EntityTrait, PaginatorTrait};
use taskly_core::{NewTaskFields, TaskPatchFields, TaskStatus};
use taskly_server::entities::task;
use taskly_server::task::{TaskService, TaskServiceError};

mod common;

fn new_task(title: &str) -> NewTaskFields {
    NewTaskFields {
        title: Some(title.to_string()),
        description: Some("Something to do".to_string()),
        due_date: Some("2024-01-01".to_string()),
        status: None,
    }
}

#[tokio::test]
async fn can_create_and_get_task() -> anyhow::Result<()> {
    let db = setup_db().await?;
    let alice = insert_user(&db, "Alice", "alice@example.com").await;
    let service = TaskService::new(&db);

    let created = service.create_task(&new_task("Buy milk"), alice).await?;
    let fetched = service.get_task(created.id).await?;

    assert_eq!(fetched, created);
    assert_eq!(fetched.status, TaskStatus::Pending);
    assert_eq!(fetched.user.name, "Alice");
    Ok(())
}

#[tokio::test]
async fn invalid_task_is_not_persisted() -> anyhow::Result<()> {
    let db = setup_db().await?;
    let alice = insert_user(&db, "Alice", "alice@example.com").await;
    let service = TaskService::new(&db);

    let result = service.create_task(&NewTaskFields::default(), alice).await;

    let Err(TaskServiceError::Validation(errors)) = result else {
        panic!("Expected a validation error, got {:?}", result);
    };
    assert_eq!(errors.len(), 3);
    assert_eq!(task::Entity::find().count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn update_by_non_owner_is_forbidden() -> anyhow::Result<()> {
    let db = setup_db().await?;
    let alice = insert_user(&db, "Alice", "alice@example.com").await;
    let bob = insert_user(&db, "Bob", "bob@example.com").await;
    let service = TaskService::new(&db);
    let created = service.create_task(&new_task("Buy milk"), alice).await?;

    let patch = TaskPatchFields {
        status: Some("completed".to_string()),
        ..Default::default()
    };
    let result = service.update_task(created.id, &patch, bob).await;

    assert!(matches!(
        result,
        Err(TaskServiceError::Forbidden { task_id, requester })
            if task_id == created.id && requester == bob
    ));
    assert_eq!(service.get_task(created.id).await?, created);
    Ok(())
}

#[tokio::test]
async fn empty_patch_leaves_task_untouched() -> anyhow::Result<()> {
    let db = setup_db().await?;
    let alice = insert_user(&db, "Alice", "alice@example.com").await;
    let service = TaskService::new(&db);
    let created = service.create_task(&new_task("Buy milk"), alice).await?;

    let updated = service
        .update_task(created.id, &TaskPatchFields::default(), alice)
        .await?;

    assert_eq!(updated, created);
    Ok(())
}

#[tokio::test]
async fn list_is_ordered_by_id() -> anyhow::Result<()> {
    let db = setup_db().await?;
    let alice = insert_user(&db, "Alice", "alice@example.com").await;
    let bob = insert_user(&db, "Bob", "bob@example.com").await;
    let service = TaskService::new(&db);
    service.create_task(&new_task("First"), bob).await?;
    service.create_task(&new_task("Second"), alice).await?;
    service.create_task(&new_task("Third"), bob).await?;

    let titles: Vec<String> = service
        .list_tasks()
        .await?
        .into_iter()
        .map(|task| task.title)
        .collect();

    assert_eq!(titles, vec!["First", "Second", "Third"]);
    Ok(())
}

#[tokio::test]
async fn delete_of_missing_task_is_not_found() -> anyhow::Result<()> {
    let db = setup_db().await?;
    let alice = insert_user(&db, "Alice", "alice@example.com").await;

    let result = TaskService::new(&db).delete_task(7, alice).await;

    assert!(matches!(result, Err(TaskServiceError::NotFound(7))));
    Ok(())
}

#[tokio::test]
async fn deleting_user_cascades_to_tasks() -> anyhow::Result<()> {
    use taskly_server::entities::user;

    let db = setup_db().await?;
    let alice = insert_user(&db, "Alice", "alice@example.com").await;
    TaskService::new(&db)
        .create_task(&new_task("Buy milk"), alice)
        .await?;

    user::Entity::delete_by_id(alice).exec(&db).await?;

    assert_eq!(task::Entity::find().count(&db).await?, 0);
    Ok(())
}

/// Runs the migrations and a task round trip against a real PostgreSQL server.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn can_round_trip_task_on_postgres() -> anyhow::Result<()> {
    let container = common::setup_container().await?;
    let db = common::setup_postgres_db(&container).await?;
    let alice = insert_user(&db, "Alice", "alice@example.com").await;
    let service = TaskService::new(&db);

    let created = service.create_task(&new_task("Buy milk"), alice).await?;

    assert_eq!(service.get_task(created.id).await?, created);
    Ok(())
}
