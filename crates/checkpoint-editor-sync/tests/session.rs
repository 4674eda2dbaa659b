//! End-to-end edit session scenarios against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use checkpoint_editor_sync::{
    Chain, ChainPatch, Draft, EditSession, Field, FieldSync, KeyEvent, MemoryStore,
    RecordingNavigator, RemoteStore, Route, SaveStatus, StaticIdentity, Step, StoreError,
    SyncConfig, UserId,
};

const WINDOW: Duration = Duration::from_millis(400);

fn owner() -> UserId {
    UserId::new("alice")
}

fn store_with(steps: Vec<Step>) -> (Arc<MemoryStore>, Chain) {
    let store = Arc::new(MemoryStore::new());
    let chain = store.create_with_steps(owner(), "", steps);
    (store, chain)
}

async fn open(store: &Arc<MemoryStore>, chain: &Chain) -> EditSession<MemoryStore> {
    EditSession::open(
        store.clone(),
        chain.id.clone(),
        Arc::new(StaticIdentity::signed_in(owner())),
        SyncConfig::default(),
    )
    .await
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn typing_burst_yields_one_write_with_final_value() {
    let (store, chain) = store_with(Vec::new());
    let session = open(&store, &chain).await;

    session.set_title("A").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.set_title("AB").unwrap();
    assert_eq!(session.title(), "AB");
    assert!(store.writes().is_empty());

    tokio::time::sleep(WINDOW + Duration::from_millis(50)).await;
    assert_eq!(store.writes_for(&chain.id), vec![ChainPatch::title("AB")]);
    assert_eq!(session.title(), "AB");

    tokio::time::sleep(WINDOW * 5).await;
    assert_eq!(store.writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn many_rapid_edits_coalesce() {
    let (store, chain) = store_with(Vec::new());
    let session = open(&store, &chain).await;

    let mut typed = String::new();
    for c in "checkpoint".chars() {
        typed.push(c);
        session.set_title(typed.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
    }
    tokio::time::sleep(WINDOW).await;

    assert_eq!(store.writes_for(&chain.id), vec![ChainPatch::title("checkpoint")]);
}

#[tokio::test(start_paused = true)]
async fn remote_checkpoints_adopted_while_title_dirty() {
    let (store, chain) = store_with(vec![Step::new("one")]);
    let session = open(&store, &chain).await;

    session.set_title("mine").unwrap();
    assert_eq!(session.field_state(Field::Title), FieldSync::LocalPending);
    assert_eq!(session.field_state(Field::Checkpoints), FieldSync::Clean);

    let remote_steps = vec![Step::new("one"), Step::new("two")];
    store
        .update(
            &chain.id,
            ChainPatch {
                title: Some("theirs".into()),
                checkpoints: Some(remote_steps.clone()),
            },
        )
        .await
        .unwrap();

    assert_eq!(session.title(), "mine");
    assert_eq!(session.checkpoints(), remote_steps);

    // Once our title lands we are the last writer.
    tokio::time::sleep(WINDOW * 2).await;
    let stored = store.get(&chain.id).await.unwrap();
    assert_eq!(stored.title, "mine");
    assert_eq!(stored.checkpoints, remote_steps);
}

#[tokio::test(start_paused = true)]
async fn toggle_middle_step_writes_prefix_immediately() {
    let (store, chain) = store_with(vec![
        Step::with_completed("Start", true),
        Step::new("Middle"),
        Step::new("End"),
    ]);
    let session = open(&store, &chain).await;

    let write = session.toggle(1).unwrap();
    let expected = vec![
        Step::with_completed("Start", true),
        Step::with_completed("Middle", true),
        Step::new("End"),
    ];
    assert_eq!(session.checkpoints(), expected);

    write.wait().await.unwrap();
    assert_eq!(store.writes_for(&chain.id), vec![ChainPatch::checkpoints(expected)]);
}

#[tokio::test(start_paused = true)]
async fn undo_redo_walks_history_exactly() {
    let (store, chain) = store_with(vec![Step::new("a"), Step::new("b"), Step::new("c")]);
    let session = open(&store, &chain).await;

    let mut history: Vec<Draft> = vec![session.draft()];
    session.set_title("T").unwrap();
    history.push(session.draft());
    session.toggle(2).unwrap();
    history.push(session.draft());
    session.move_step(0, Some(2)).unwrap();
    history.push(session.draft());
    session.add_step().unwrap();
    history.push(session.draft());
    session.set_step_text(3, "d").unwrap();
    history.push(session.draft());

    let last = history.len() - 1;
    for expected in history[..last].iter().rev() {
        assert!(session.undo().unwrap().is_some());
        assert_eq!(&session.draft(), expected);
    }
    assert!(session.undo().unwrap().is_none());

    for expected in &history[1..] {
        assert!(session.redo().unwrap().is_some());
        assert_eq!(&session.draft(), expected);
    }
    assert!(!session.can_redo());

    // Undo/redo persist immediately and supersede any pending typing.
    tokio::time::sleep(WINDOW * 2).await;
    let stored = store.get(&chain.id).await.unwrap();
    assert_eq!(stored.draft(), history[last]);
}

#[tokio::test(start_paused = true)]
async fn new_edit_clears_redo() {
    let (store, chain) = store_with(vec![Step::new("a")]);
    let session = open(&store, &chain).await;

    session.add_step().unwrap();
    session.undo().unwrap();
    assert!(session.can_redo());

    session.set_step_text(0, "changed").unwrap();
    assert!(!session.can_redo());
    assert!(session.redo().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_write_shows_error_until_next_success() {
    let (store, chain) = store_with(Vec::new());
    let session = open(&store, &chain).await;
    let mut status = session.watch_status();

    store.fail_next_update(StoreError::Unavailable("network down".into()));
    session.set_title("offline edit").unwrap();
    tokio::time::sleep(WINDOW * 2).await;

    assert!(status.has_changed().unwrap());
    assert!(status.borrow_and_update().is_error());
    assert_eq!(session.title(), "offline edit");
    assert_eq!(session.field_state(Field::Title), FieldSync::Clean);

    session.set_title("online edit").unwrap();
    tokio::time::sleep(WINDOW * 2).await;
    assert_eq!(session.status(), SaveStatus::Saved);
    assert_eq!(store.get(&chain.id).await.unwrap().title, "online edit");
}

#[tokio::test(start_paused = true)]
async fn leaving_tears_everything_down() {
    let (store, chain) = store_with(Vec::new());
    let session = open(&store, &chain).await;
    let nav = RecordingNavigator::default();
    let handler = session.key_handler();

    session.set_title("unsaved").unwrap();
    session.cancel(&nav);

    assert_eq!(store.subscriber_count(&chain.id), 0);
    assert!(!handler(&KeyEvent::new("z").ctrl()));
    tokio::time::sleep(WINDOW * 3).await;
    assert!(store.writes().is_empty());
    assert_eq!(nav.visited(), vec![Route::MyChains]);
    assert_eq!(Route::MyChains.path(), "/my-checkpoints");
}

#[tokio::test(start_paused = true)]
async fn second_session_sees_first_sessions_writes() {
    let (store, chain) = store_with(vec![Step::new("a")]);
    let first = open(&store, &chain).await;
    let second = open(&store, &chain).await;

    first.set_step_text(0, "edited").unwrap();
    tokio::time::sleep(WINDOW * 2).await;
    assert_eq!(second.checkpoints(), vec![Step::new("edited")]);

    second.add_step().unwrap().wait().await.unwrap();
    assert_eq!(first.checkpoints().len(), 2);
}
