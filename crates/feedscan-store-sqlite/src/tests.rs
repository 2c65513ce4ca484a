//! Integration tests for `SqliteStore` against an in-memory database.

use feedscan_core::{
  record::{Insertion, PostKind, RecordKind},
  store::{CheckpointCommit, DedupStore},
  subject::Checkpoint,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn subject(s: &SqliteStore, name: &str) -> i64 {
  s.create_subject(name).await.unwrap().id().expect("fresh subject")
}

async fn post(s: &SqliteStore, key: &str, subject_id: i64) -> i64 {
  s.record_post(key, subject_id, PostKind::Unknown)
    .await
    .unwrap()
    .id()
    .expect("fresh post")
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_subject() {
  let s = store().await;

  let id = subject(&s, "alice").await;
  let fetched = s.get_subject(id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "alice");
  assert_eq!(fetched.checkpoint, Checkpoint::Depth(0));

  let by_name = s.find_subject("alice").await.unwrap().unwrap();
  assert_eq!(by_name.subject_id, id);
  assert!(s.find_subject("bob").await.unwrap().is_none());
  assert!(s.get_subject(id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_subject_is_reported_not_inserted() {
  let s = store().await;
  subject(&s, "alice").await;

  let again = s.create_subject("alice").await.unwrap();
  assert_eq!(again, Insertion::duplicate(RecordKind::Subject, "alice"));
  assert_eq!(s.list_subjects().await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_subjects_in_id_order() {
  let s = store().await;
  for name in ["carol", "alice", "bob"] {
    subject(&s, name).await;
  }

  let names: Vec<_> = s
    .list_subjects()
    .await
    .unwrap()
    .into_iter()
    .map(|sub| sub.name)
    .collect();
  assert_eq!(names, ["carol", "alice", "bob"]);
}

// ─── Posts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_post_key_succeeds_once() {
  let s = store().await;
  let alice = subject(&s, "alice").await;

  let mut ids = Vec::new();
  let mut duplicates = 0;
  for key in ["p1", "p1", "p2", "p1", "p3", "p2"] {
    match s.record_post(key, alice, PostKind::Unknown).await.unwrap() {
      Insertion::Inserted(id) => ids.push(id),
      Insertion::Duplicate(dup) => {
        assert_eq!(dup.kind, RecordKind::Post);
        duplicates += 1;
      }
    }
  }

  assert_eq!(ids.len(), 3);
  assert_eq!(duplicates, 3);
  assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids not increasing: {ids:?}");
}

#[tokio::test]
async fn ids_are_not_reused_after_rejection() {
  let s = store().await;
  let alice = subject(&s, "alice").await;

  let first = post(&s, "p1", alice).await;
  assert!(s.record_post("p1", alice, PostKind::Unknown).await.unwrap().is_duplicate());
  let second = post(&s, "p2", alice).await;
  assert!(second > first);
}

#[tokio::test]
async fn duplicate_post_keeps_original_kind() {
  let s = store().await;
  let alice = subject(&s, "alice").await;

  let id = s
    .record_post("p1", alice, PostKind::Media)
    .await
    .unwrap()
    .id()
    .unwrap();
  assert!(s.record_post("p1", alice, PostKind::Unknown).await.unwrap().is_duplicate());

  let stored = s.get_post(id).await.unwrap().unwrap();
  assert_eq!(stored.kind, PostKind::Media);
  assert_eq!(stored.natural_key, "p1");
  assert_eq!(stored.subject_id, alice);
}

#[tokio::test]
async fn post_for_missing_subject_is_rejected() {
  let s = store().await;
  let err = s.record_post("p1", 42, PostKind::Unknown).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::DanglingReference { kind: RecordKind::Post, .. }
  ));
}

#[tokio::test]
async fn update_post_kind_overwrites() {
  let s = store().await;
  let alice = subject(&s, "alice").await;
  let id = post(&s, "p1", alice).await;

  s.update_post_kind(id, PostKind::NonMedia).await.unwrap();
  assert_eq!(s.get_post(id).await.unwrap().unwrap().kind, PostKind::NonMedia);

  let err = s.update_post_kind(id + 1, PostKind::Media).await.unwrap_err();
  assert!(matches!(err, crate::Error::PostNotFound(_)));
}

#[tokio::test]
async fn pending_posts_are_unknown_in_insertion_order() {
  let s = store().await;
  let alice = subject(&s, "alice").await;
  let bob = subject(&s, "bob").await;

  let p1 = post(&s, "p1", alice).await;
  s.record_post("p2", alice, PostKind::Media).await.unwrap();
  let p3 = post(&s, "p3", bob).await;
  let p4 = post(&s, "p4", alice).await;

  let pending = s.pending_posts(10).await.unwrap();
  let ids: Vec<_> = pending.iter().map(|p| p.post_id).collect();
  assert_eq!(ids, [p1, p3, p4]);
  assert_eq!(pending[1].subject_id, bob);
  assert_eq!(pending[1].natural_key, "p3");

  assert_eq!(s.pending_posts(2).await.unwrap().len(), 2);

  s.update_post_kind(p1, PostKind::NonMedia).await.unwrap();
  let ids: Vec<_> = s
    .pending_posts(10)
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.post_id)
    .collect();
  assert_eq!(ids, [p3, p4]);
}

// ─── Media ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn media_duplicates_are_rejected_per_key() {
  let s = store().await;
  let alice = subject(&s, "alice").await;
  let p1 = post(&s, "p1", alice).await;

  let a = s.record_media("https://img/a.jpg", p1, alice).await.unwrap();
  let b = s.record_media("https://img/b.jpg", p1, alice).await.unwrap();
  let again = s.record_media("https://img/a.jpg", p1, alice).await.unwrap();

  assert!(a.id().unwrap() < b.id().unwrap());
  assert_eq!(again, Insertion::duplicate(RecordKind::Media, "https://img/a.jpg"));
  assert_eq!(s.counts().await.unwrap().media, 2);
}

#[tokio::test]
async fn media_for_missing_post_is_rejected() {
  let s = store().await;
  let alice = subject(&s, "alice").await;
  let err = s.record_media("https://img/a.jpg", 99, alice).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::DanglingReference { kind: RecordKind::Media, .. }
  ));
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_media_insert_has_one_winner() {
  let s = store().await;
  let alice = subject(&s, "alice").await;
  let p1 = post(&s, "p1", alice).await;

  let (left, right) = (s.clone(), s.clone());
  let a = tokio::spawn(async move {
    left.record_media("https://img/a.jpg", p1, alice).await
  });
  let b = tokio::spawn(async move {
    right.record_media("https://img/a.jpg", p1, alice).await
  });

  let outcomes = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
  let winners = outcomes.iter().filter(|o| !o.is_duplicate()).count();
  assert_eq!(winners, 1);
  assert_eq!(s.counts().await.unwrap().media, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_post_inserts_allocate_distinct_ids() {
  let s = store().await;
  let alice = subject(&s, "alice").await;

  let mut handles = Vec::new();
  for i in 0..32 {
    let s = s.clone();
    // Every key appears twice.
    let key = format!("p{}", i % 16);
    handles.push(tokio::spawn(async move {
      s.record_post(&key, alice, PostKind::Unknown).await
    }));
  }

  let mut ids = Vec::new();
  for h in handles {
    if let Insertion::Inserted(id) = h.await.unwrap().unwrap() {
      ids.push(id);
    }
  }
  ids.sort_unstable();
  ids.dedup();
  assert_eq!(ids.len(), 16);
  assert_eq!(s.counts().await.unwrap().posts, 16);
}

// ─── Checkpoints ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn lower_checkpoint_is_rejected() {
  let s = store().await;
  let alice = subject(&s, "alice").await;

  let first = s.commit_checkpoint(alice, Checkpoint::Depth(50)).await.unwrap();
  assert_eq!(first, CheckpointCommit::Committed { previous: Checkpoint::Depth(0) });

  let second = s.commit_checkpoint(alice, Checkpoint::Depth(30)).await.unwrap();
  assert_eq!(second, CheckpointCommit::Rejected { current: Checkpoint::Depth(50) });

  let stored = s.get_subject(alice).await.unwrap().unwrap();
  assert_eq!(stored.checkpoint, Checkpoint::Depth(50));
}

#[tokio::test]
async fn equal_checkpoint_is_accepted() {
  let s = store().await;
  let alice = subject(&s, "alice").await;
  s.commit_checkpoint(alice, Checkpoint::Depth(50)).await.unwrap();
  let again = s.commit_checkpoint(alice, Checkpoint::Depth(50)).await.unwrap();
  assert!(again.is_committed());
}

#[tokio::test]
async fn done_is_sticky_until_reset() {
  let s = store().await;
  let alice = subject(&s, "alice").await;
  s.commit_checkpoint(alice, Checkpoint::Depth(900)).await.unwrap();

  let done = s.commit_checkpoint(alice, Checkpoint::Done).await.unwrap();
  assert_eq!(done, CheckpointCommit::Committed { previous: Checkpoint::Depth(900) });

  let lower = s.commit_checkpoint(alice, Checkpoint::Depth(5000)).await.unwrap();
  assert_eq!(lower, CheckpointCommit::Rejected { current: Checkpoint::Done });
  assert!(s.commit_checkpoint(alice, Checkpoint::Done).await.unwrap().is_committed());

  assert!(s.reset_checkpoint(alice).await.unwrap());
  let stored = s.get_subject(alice).await.unwrap().unwrap();
  assert_eq!(stored.checkpoint, Checkpoint::Depth(0));
}

#[tokio::test]
async fn reset_only_applies_to_done_subjects() {
  let s = store().await;
  let alice = subject(&s, "alice").await;
  s.commit_checkpoint(alice, Checkpoint::Depth(700)).await.unwrap();

  assert!(!s.reset_checkpoint(alice).await.unwrap());
  let stored = s.get_subject(alice).await.unwrap().unwrap();
  assert_eq!(stored.checkpoint, Checkpoint::Depth(700));
}

#[tokio::test]
async fn checkpoint_of_missing_subject_errors() {
  let s = store().await;
  let err = s.commit_checkpoint(7, Checkpoint::Depth(1)).await.unwrap_err();
  assert!(matches!(err, crate::Error::SubjectNotFound(7)));
  let err = s.reset_checkpoint(7).await.unwrap_err();
  assert!(matches!(err, crate::Error::SubjectNotFound(7)));
}

// ─── Durability ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn records_survive_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("feedscan.db");

  let alice = {
    let s = SqliteStore::open(&path).await.unwrap();
    let alice = subject(&s, "alice").await;
    let p1 = post(&s, "p1", alice).await;
    s.record_media("https://img/a.jpg", p1, alice).await.unwrap();
    s.commit_checkpoint(alice, Checkpoint::Depth(1500)).await.unwrap();
    alice
  };

  let s = SqliteStore::open(&path).await.unwrap();
  let counts = s.counts().await.unwrap();
  assert_eq!((counts.subjects, counts.posts, counts.media), (1, 1, 1));
  assert_eq!(
    s.get_subject(alice).await.unwrap().unwrap().checkpoint,
    Checkpoint::Depth(1500)
  );
  assert!(s.record_post("p1", alice, PostKind::Unknown).await.unwrap().is_duplicate());
}
