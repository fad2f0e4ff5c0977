//! Tests for the persistence layer.

use tempfile::TempDir;
use uuid::Uuid;

use super::*;
use crate::category::CounterKey;

fn store() -> SqliteStore {
    SqliteStore::in_memory().expect("failed to open in-memory store")
}

fn register(store: &SqliteStore, name: &str) -> OwnerId {
    let owner_id = Uuid::new_v4();
    store
        .with_transaction::<_, StoreError>(|tx| {
            owners::insert(tx, owner_id, name)?;
            Ok(())
        })
        .expect("failed to register owner");
    owner_id
}

fn sample_record(owner_id: OwnerId, category: Category, seq: u64) -> ArticleRecord {
    ArticleRecord {
        article_id: Uuid::new_v4(),
        owner_id,
        category,
        seq,
        title: format!("entry {seq}"),
        body: "logged a session".to_string(),
        created_at_ns: now_ns(),
        updated_at_ns: now_ns(),
    }
}

#[test]
fn test_open_on_disk() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("ordo.db");
    let store = SqliteStore::open(&path).expect("failed to open store");
    assert_eq!(store.path(), Some(path.as_path()));

    // Reopening applies the schema idempotently.
    drop(store);
    SqliteStore::open(&path).expect("failed to reopen store");
}

#[test]
fn test_owner_roundtrip() {
    let store = store();
    let owner_id = Uuid::new_v4();

    store
        .with_transaction::<_, StoreError>(|tx| {
            assert!(!owners::exists(tx, owner_id)?);
            owners::insert(tx, owner_id, "dana")?;
            assert!(owners::exists(tx, owner_id)?);
            Ok(())
        })
        .expect("transaction failed");
}

#[test]
fn test_duplicate_owner_rejected() {
    let store = store();
    let owner_id = register(&store, "dana");

    let err = store
        .with_transaction::<_, StoreError>(|tx| {
            owners::insert(tx, owner_id, "dana again")?;
            Ok(())
        })
        .expect_err("duplicate registration must fail");
    assert!(matches!(
        err,
        StoreError::OwnerAlreadyExists { owner_id: o } if o == owner_id
    ));
}

#[test]
fn test_counter_lazily_initialized() {
    let store = store();
    let owner_id = register(&store, "dana");
    let key = CounterKey::new(owner_id, Category::Running);

    store
        .with_transaction::<_, StoreError>(|tx| {
            let counter = counters::lock_or_init(tx, key)?;
            assert_eq!(counter.size, 0);
            assert_eq!(counter.version, 0);

            // Second call reads the same row instead of reinitializing.
            let again = counters::lock_or_init(tx, key)?;
            assert_eq!(again, counter);
            Ok(())
        })
        .expect("transaction failed");
}

#[test]
fn test_set_size_bumps_version() {
    let store = store();
    let owner_id = register(&store, "dana");
    let key = CounterKey::new(owner_id, Category::Running);

    store
        .with_transaction::<_, StoreError>(|tx| {
            let counter = counters::lock_or_init(tx, key)?;
            let counter = counters::set_size(tx, &counter, 3)?;
            assert_eq!(counter.size, 3);
            assert_eq!(counter.version, 1);

            let reread = counters::lock_or_init(tx, key)?;
            assert_eq!(reread, counter);
            Ok(())
        })
        .expect("transaction failed");
}

#[test]
fn test_stale_version_is_concurrent_modification() {
    let store = store();
    let owner_id = register(&store, "dana");
    let key = CounterKey::new(owner_id, Category::Running);

    let err = store
        .with_transaction::<_, StoreError>(|tx| {
            let counter = counters::lock_or_init(tx, key)?;
            counters::set_size(tx, &counter, 1)?;
            // Writing through the stale snapshot must be refused.
            counters::set_size(tx, &counter, 2)?;
            Ok(())
        })
        .expect_err("stale write must fail");
    assert!(matches!(err, StoreError::ConcurrentModification { .. }));
}

#[test]
fn test_decrement_underflow() {
    let store = store();
    let owner_id = register(&store, "dana");
    let key = CounterKey::new(owner_id, Category::Running);

    let err = store
        .with_transaction::<_, StoreError>(|tx| {
            let counter = counters::lock_or_init(tx, key)?;
            counters::decrement(tx, &counter)?;
            Ok(())
        })
        .expect_err("decrementing an empty counter must fail");
    assert!(matches!(err, StoreError::CounterUnderflow { .. }));
}

#[test]
fn test_article_roundtrip() {
    let store = store();
    let owner_id = register(&store, "dana");
    let record = sample_record(owner_id, Category::Running, 1);

    store
        .with_transaction::<_, StoreError>(|tx| {
            articles::insert(tx, &record)?;

            let found = articles::find(tx, record.article_id)?.expect("article missing");
            assert_eq!(found, record);

            articles::update_content(tx, record.article_id, "renamed", "edited")?;
            let updated = articles::find(tx, record.article_id)?.expect("article missing");
            assert_eq!(updated.title, "renamed");
            assert_eq!(updated.body, "edited");
            assert_eq!(updated.seq, record.seq, "content update must not touch seq");

            assert!(articles::delete(tx, record.article_id)?);
            assert!(articles::find(tx, record.article_id)?.is_none());
            assert!(!articles::delete(tx, record.article_id)?);
            Ok(())
        })
        .expect("transaction failed");
}

#[test]
fn test_shift_left_decrements_tail_only() {
    let store = store();
    let owner_id = register(&store, "dana");

    store
        .with_transaction::<_, StoreError>(|tx| {
            for seq in 1..=5 {
                articles::insert(tx, &sample_record(owner_id, Category::Running, seq))?;
            }
            // An unrelated group must not be touched.
            articles::insert(tx, &sample_record(owner_id, Category::Yoga, 1))?;

            let shifted = articles::shift_left(tx, owner_id, Category::Running, 2)?;
            assert_eq!(shifted, 3);

            let seqs = articles::seqs_in_group(tx, owner_id, Category::Running)?;
            assert_eq!(seqs, vec![1, 2, 2, 3, 4]);

            let yoga = articles::seqs_in_group(tx, owner_id, Category::Yoga)?;
            assert_eq!(yoga, vec![1]);
            Ok(())
        })
        .expect("transaction failed");
}

#[test]
fn test_set_placement_moves_article() {
    let store = store();
    let owner_id = register(&store, "dana");
    let record = sample_record(owner_id, Category::Running, 2);

    store
        .with_transaction::<_, StoreError>(|tx| {
            articles::insert(tx, &record)?;
            articles::set_placement(tx, record.article_id, Category::Swimming, 1)?;

            let moved = articles::find(tx, record.article_id)?.expect("article missing");
            assert_eq!(moved.category, Category::Swimming);
            assert_eq!(moved.seq, 1);
            Ok(())
        })
        .expect("transaction failed");
}

#[test]
fn test_in_group_orders_by_seq() {
    let store = store();
    let owner_id = register(&store, "dana");

    store
        .with_transaction::<_, StoreError>(|tx| {
            for seq in [3, 1, 2] {
                articles::insert(tx, &sample_record(owner_id, Category::Gym, seq))?;
            }
            let group = articles::in_group(tx, owner_id, Category::Gym)?;
            let seqs: Vec<u64> = group.iter().map(|a| a.seq).collect();
            assert_eq!(seqs, vec![1, 2, 3]);
            Ok(())
        })
        .expect("transaction failed");
}

#[test]
fn test_unknown_category_row_is_surfaced() {
    let store = store();
    let owner_id = register(&store, "dana");
    let article_id = Uuid::new_v4();

    let err = store
        .with_transaction::<_, StoreError>(|tx| {
            tx.execute(
                "INSERT INTO articles
                    (article_id, owner_id, category, seq, title, body,
                     created_at_ns, updated_at_ns)
                 VALUES (?1, ?2, 'UNDERWATER_CHESS', 1, 't', 'b', 0, 0)",
                rusqlite::params![article_id.to_string(), owner_id.to_string()],
            )
            .map_err(StoreError::Database)?;
            articles::find(tx, article_id)?;
            Ok(())
        })
        .expect_err("junk category must be rejected on read");
    assert!(matches!(
        err,
        StoreError::UnknownCategory { value } if value == "UNDERWATER_CHESS"
    ));
}

#[test]
fn test_counter_sizes_for_owner() {
    let store = store();
    let owner_id = register(&store, "dana");

    store
        .with_transaction::<_, StoreError>(|tx| {
            let running = counters::lock_or_init(
                tx,
                CounterKey::new(owner_id, Category::Running),
            )?;
            counters::set_size(tx, &running, 4)?;
            counters::lock_or_init(tx, CounterKey::new(owner_id, Category::Gym))?;

            let mut sizes = counters::sizes_for_owner(tx, owner_id)?;
            sizes.sort_by_key(|(c, _)| c.lock_rank());
            assert_eq!(
                sizes,
                vec![(Category::Gym, 0), (Category::Running, 4)]
            );
            Ok(())
        })
        .expect("transaction failed");
}
