//! Concurrency properties of the sequence allocator.
//!
//! These tests drive one allocator from multiple threads against an
//! on-disk database and check the two load-bearing guarantees: concurrent
//! creates for one key produce a gap-free run, and adversarially ordered
//! moves cannot deadlock.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use ordo_core::allocator::SequenceAllocator;
use ordo_core::category::Category;
use ordo_core::config::OrdoConfig;
use ordo_core::store::{ArticleDraft, SqliteStore};
use tempfile::TempDir;

fn draft(category: Category, title: &str) -> ArticleDraft {
    ArticleDraft {
        category,
        title: title.to_string(),
        body: "logged a session".to_string(),
    }
}

fn temp_allocator() -> (Arc<SequenceAllocator>, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = SqliteStore::open(dir.path().join("ordo.db")).expect("failed to open store");
    let allocator = SequenceAllocator::new(store, &OrdoConfig::default());
    (Arc::new(allocator), dir)
}

#[test]
fn concurrent_creates_are_gap_free() {
    let (alloc, _dir) = temp_allocator();
    let owner_id = alloc
        .register_owner(None, "dana")
        .expect("failed to register owner")
        .owner_id;

    const THREADS: usize = 8;
    const PER_THREAD: usize = 10;

    let mut workers = Vec::new();
    for t in 0..THREADS {
        let alloc = Arc::clone(&alloc);
        workers.push(thread::spawn(move || {
            let mut seqs = Vec::new();
            for i in 0..PER_THREAD {
                let article = alloc
                    .create(owner_id, draft(Category::Running, &format!("t{t} run {i}")))
                    .expect("create failed");
                seqs.push(article.seq);
            }
            seqs
        }));
    }

    let mut all_seqs: Vec<u64> = Vec::new();
    for worker in workers {
        all_seqs.extend(worker.join().expect("worker panicked"));
    }

    all_seqs.sort_unstable();
    let expected: Vec<u64> = (1..=(THREADS * PER_THREAD) as u64).collect();
    assert_eq!(all_seqs, expected, "seqs must be a gap-free run");

    let report = alloc
        .audit_group(owner_id, Category::Running)
        .expect("failed to audit");
    assert!(report.is_dense());
}

#[test]
fn adversarial_moves_do_not_deadlock() {
    let (alloc, _dir) = temp_allocator();
    let owner_id = alloc
        .register_owner(None, "dana")
        .expect("failed to register owner")
        .owner_id;

    // One article in each of two categories; the threads swap them in
    // opposite directions repeatedly.
    let a = alloc
        .create(owner_id, draft(Category::Running, "a"))
        .expect("create failed");
    let b = alloc
        .create(owner_id, draft(Category::Swimming, "b"))
        .expect("create failed");

    let (done_tx, done_rx) = mpsc::channel();
    let mut workers = Vec::new();
    for (article_id, from, to) in [
        (a.article_id, Category::Running, Category::Swimming),
        (b.article_id, Category::Swimming, Category::Running),
    ] {
        let alloc = Arc::clone(&alloc);
        let done = done_tx.clone();
        workers.push(thread::spawn(move || {
            let mut target = to;
            let mut other = from;
            for _ in 0..20 {
                alloc
                    .move_article(owner_id, article_id, target)
                    .expect("move failed");
                std::mem::swap(&mut target, &mut other);
            }
            done.send(()).expect("failed to signal completion");
        }));
    }
    drop(done_tx);

    // Both movers must finish well within the bound; a deadlock would
    // park them on each other's counter lock until the timeout.
    for _ in 0..2 {
        done_rx
            .recv_timeout(Duration::from_secs(30))
            .expect("a mover failed to finish in time: possible deadlock");
    }
    for worker in workers {
        worker.join().expect("worker panicked");
    }

    for report in alloc.audit_owner(owner_id).expect("failed to audit") {
        assert!(report.is_dense(), "group {} is not dense", report.category);
    }
}

#[test]
fn moves_and_creates_interleave_densely() {
    let (alloc, _dir) = temp_allocator();
    let owner_id = alloc
        .register_owner(None, "dana")
        .expect("failed to register owner")
        .owner_id;

    let seed = alloc
        .create(owner_id, draft(Category::Gym, "seed"))
        .expect("create failed");

    let creator = {
        let alloc = Arc::clone(&alloc);
        thread::spawn(move || {
            for i in 0..25 {
                alloc
                    .create(owner_id, draft(Category::Gym, &format!("g{i}")))
                    .expect("create failed");
            }
        })
    };
    let mover = {
        let alloc = Arc::clone(&alloc);
        thread::spawn(move || {
            let mut target = Category::Yoga;
            let mut other = Category::Gym;
            for _ in 0..10 {
                alloc
                    .move_article(owner_id, seed.article_id, target)
                    .expect("move failed");
                std::mem::swap(&mut target, &mut other);
            }
        })
    };

    creator.join().expect("creator panicked");
    mover.join().expect("mover panicked");

    for report in alloc.audit_owner(owner_id).expect("failed to audit") {
        assert!(report.is_dense(), "group {} is not dense", report.category);
    }
}
