use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use taskpad_core::db::open_db_in_memory;
use taskpad_core::{Priority, Task, TaskRepository, TaskStore, UNSAVED_TASK_ID};

fn store() -> Arc<TaskStore> {
    Arc::new(TaskStore::new(open_db_in_memory().unwrap()))
}

#[test]
fn insert_assigns_fresh_positive_ids() {
    let store = store();
    let mut seen = HashSet::new();

    for n in 0..5 {
        let id = store
            .insert(&Task::new(format!("task {n}"), "body", Priority::None))
            .unwrap();
        assert!(id > 0);
        assert!(seen.insert(id), "id {id} was reused");
    }

    let all = store.all_tasks().unwrap();
    assert_eq!(all.len(), 5);
    let ids = all.iter().map(|task| task.id).collect::<Vec<_>>();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted, "all tasks are ordered by id ascending");
}

#[test]
fn deleted_ids_are_not_reused() {
    let store = store();
    let first = store.insert(&Task::new("a", "b", Priority::Low)).unwrap();
    store.delete(first).unwrap();
    let second = store.insert(&Task::new("c", "d", Priority::Low)).unwrap();
    assert!(second > first);
}

#[test]
fn update_changes_only_the_target_row() {
    let store = store();
    let keep = store.insert(&Task::new("keep", "same", Priority::Low)).unwrap();
    let target = store.insert(&Task::new("old", "old", Priority::Low)).unwrap();

    let changed = store
        .update(&Task::with_id(target, "new", "new body", Priority::High))
        .unwrap();
    assert_eq!(changed, 1);

    let all = store.all_tasks().unwrap();
    assert_eq!(all[0], Task::with_id(keep, "keep", "same", Priority::Low));
    assert_eq!(all[1], Task::with_id(target, "new", "new body", Priority::High));
}

#[test]
fn update_and_delete_of_absent_id_affect_nothing() {
    let store = store();
    store.insert(&Task::new("a", "b", Priority::Low)).unwrap();

    assert_eq!(
        store
            .update(&Task::with_id(404, "x", "y", Priority::High))
            .unwrap(),
        0
    );
    assert_eq!(store.delete(404).unwrap(), 0);
    assert_eq!(
        store
            .update(&Task::with_id(UNSAVED_TASK_ID, "x", "y", Priority::High))
            .unwrap(),
        0
    );
    assert_eq!(store.all_tasks().unwrap().len(), 1);
}

#[test]
fn delete_removes_exactly_one_row_and_delete_all_clears() {
    let store = store();
    let a = store.insert(&Task::new("a", "1", Priority::Low)).unwrap();
    store.insert(&Task::new("b", "2", Priority::High)).unwrap();
    store.insert(&Task::new("c", "3", Priority::Medium)).unwrap();

    assert_eq!(store.delete(a).unwrap(), 1);
    assert_eq!(store.all_tasks().unwrap().len(), 2);
    assert!(store.get_task(a).unwrap().is_none());

    assert_eq!(store.delete_all().unwrap(), 2);
    assert!(store.all_tasks().unwrap().is_empty());
    assert!(store.tasks_with_priority(Priority::High).unwrap().is_empty());
}

#[test]
fn title_search_is_case_insensitive_contains() {
    let store = store();
    store.insert(&Task::new("Buy milk", "2%", Priority::Low)).unwrap();
    store.insert(&Task::new("MILK run", "store", Priority::High)).unwrap();
    store.insert(&Task::new("Walk dog", "milk in description", Priority::Low)).unwrap();

    let hits = store.search_by_title("%milk%").unwrap();
    let titles = hits.iter().map(|task| task.title.as_str()).collect::<Vec<_>>();
    assert_eq!(titles, vec!["Buy milk", "MILK run"]);

    assert!(store.search_by_title("milk").unwrap().is_empty());
}

#[test]
fn priority_filter_is_exact() {
    let store = store();
    store.insert(&Task::new("l", "d", Priority::Low)).unwrap();
    store.insert(&Task::new("m", "d", Priority::Medium)).unwrap();
    store.insert(&Task::new("h", "d", Priority::High)).unwrap();
    store.insert(&Task::new("n", "d", Priority::None)).unwrap();

    for priority in Priority::ALL {
        let tasks = store.tasks_with_priority(priority).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].priority, priority);
    }
}

#[tokio::test]
async fn live_queries_redeliver_after_mutations() {
    let store = store();
    let mut all = store.live_all_tasks();
    let mut low = store.live_tasks_with_priority(Priority::Low);

    assert!(all.next().await.unwrap().unwrap().is_empty());
    assert!(low.next().await.unwrap().unwrap().is_empty());

    let id = store.insert(&Task::new("Buy milk", "2%", Priority::Low)).unwrap();
    let snapshot = next_within(&mut all).await;
    assert_eq!(snapshot, vec![Task::with_id(id, "Buy milk", "2%", Priority::Low)]);
    assert_eq!(next_within(&mut low).await.len(), 1);

    store.delete_all().unwrap();
    assert!(next_within(&mut all).await.is_empty());
    assert!(next_within(&mut low).await.is_empty());
}

#[tokio::test]
async fn repository_writes_run_in_background_and_wake_live_queries() {
    let repo = TaskRepository::new(store());
    let mut all = repo.get_all_tasks();
    assert!(all.next().await.unwrap().unwrap().is_empty());

    let id = repo
        .add_task(Task::new("Walk dog", "park", Priority::High))
        .await
        .unwrap();
    assert_eq!(next_within(&mut all).await[0].id, id);

    let changed = repo
        .update_task(Task::with_id(id, "Walk dog", "beach", Priority::High))
        .await
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(next_within(&mut all).await[0].description, "beach");

    let mut selected = repo.get_selected_task(id);
    assert!(selected.next().await.unwrap().unwrap().is_some());
    assert_eq!(
        repo.delete_task(Task::with_id(id, "", "", Priority::None))
            .await
            .unwrap(),
        1
    );
    assert!(next_within(&mut selected).await.is_none());
}

async fn next_within<T, E>(query: &mut taskpad_core::LiveQuery<T, E>) -> T
where
    T: Send + 'static,
    E: Send + std::fmt::Debug + 'static,
{
    tokio::time::timeout(Duration::from_secs(5), query.next())
        .await
        .expect("live query did not redeliver in time")
        .expect("live query closed")
        .unwrap()
}
