//! Git-notes store round-trips on a throwaway repository.

use inbox_mirror::digest::blob_digest;
use inbox_mirror::mirror::MailRecord;
use inbox_mirror::store::git_notes::DEFAULT_NOTES_REF;
use inbox_mirror::store::{GitNotesStore, KvStore, KvStoreExt};

fn record(message_id: &str, comment_id: Option<u64>) -> MailRecord {
    MailRecord {
        message_id: message_id.to_string(),
        pull_request_url: "https://github.com/octo/widgets/pull/5".to_string(),
        original_commit: None,
        issue_comment_id: comment_id,
    }
}

#[test]
fn notes_store_roundtrip_on_fresh_repository() {
    let dir = tempfile::tempdir().expect("temp dir");
    gix::init_bare(dir.path()).expect("init repository");

    let store = GitNotesStore::new(dir.path(), DEFAULT_NOTES_REF);

    // nothing there before the first write
    assert!(store.get_raw("m1@example.com").expect("read").is_none());
    assert!(store.list_digests().expect("list").is_empty());

    let first = record("m1@example.com", None);
    store.set("m1@example.com", &first).expect("first write");
    let read: MailRecord = store
        .get("m1@example.com")
        .expect("read")
        .expect("record present");
    assert_eq!(read, first);

    // a second key lands next to the first
    let second = record("m2@example.com", Some(7));
    store.set("m2@example.com", &second).expect("second write");
    let digests = store.list_digests().expect("list");
    assert_eq!(digests.len(), 2);
    assert!(digests.contains(&blob_digest("m1@example.com")));
    assert!(digests.contains(&blob_digest("m2@example.com")));

    // overwriting replaces the entry in place
    let updated = record("m1@example.com", Some(42));
    store.set("m1@example.com", &updated).expect("overwrite");
    assert_eq!(store.list_digests().expect("list").len(), 2);
    let read: MailRecord = store
        .get("m1@example.com")
        .expect("read")
        .expect("record present");
    assert_eq!(read, updated);
}

#[test]
fn notes_store_is_readable_through_a_second_handle() {
    let dir = tempfile::tempdir().expect("temp dir");
    gix::init_bare(dir.path()).expect("init repository");

    let writer = GitNotesStore::new(dir.path(), DEFAULT_NOTES_REF);
    writer
        .set("m1@example.com", &record("m1@example.com", Some(3)))
        .expect("write");

    // a fresh handle sees the committed state
    let reader = GitNotesStore::new(dir.path(), DEFAULT_NOTES_REF);
    let read: MailRecord = reader
        .get("m1@example.com")
        .expect("read")
        .expect("record present");
    assert_eq!(read.issue_comment_id, Some(3));
}
