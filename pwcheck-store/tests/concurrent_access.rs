use std::env;
use std::fs;
use std::process::Command;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use pwcheck_store::{CredentialStore, StoreError};

const WRITERS: usize = 6;
const SAVES_PER_WRITER: usize = 5;

const PROCESSES: usize = 4;
const CHILD_STORE_ENV: &str = "PWCHECK_STORE_CHILD_PATH";
const CHILD_WRITER_ENV: &str = "PWCHECK_STORE_CHILD_WRITER";

/// Independent store instances share nothing in memory, so only the lock file keeps
/// them from clobbering each other, the same as separate CLI processes.
#[test]
fn test_independent_stores_do_not_lose_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passwords.json");
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let store = CredentialStore::open(&path).unwrap();
                barrier.wait();
                for n in 0..SAVES_PER_WRITER {
                    store.save(&format!("writer-{writer}-{n}"), "secret").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let raw = fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["entries"].as_array().unwrap().len(), WRITERS * SAVES_PER_WRITER);

    let store = CredentialStore::open(&path).unwrap();
    assert_eq!(store.list().unwrap().len(), WRITERS * SAVES_PER_WRITER);
    assert!(!dir.path().join("passwords.json.lock").exists());
}

#[test]
fn test_same_label_from_many_writers_collapses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passwords.json");

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            thread::spawn(move || {
                let store = CredentialStore::open(&path).unwrap();
                let label = if writer % 2 == 0 { "Shared" } else { "SHARED" };
                store.save(label, &format!("secret-{writer}")).unwrap()
            })
        })
        .collect();
    let records: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let store = CredentialStore::open(&path).unwrap();
    let entries = store.list().unwrap();
    assert_eq!(entries.len(), 1);

    // every writer saw the same creation time as the first one
    let created = entries[0].created_at;
    assert!(records.iter().all(|r| r.created_at == created));
}

#[test]
fn test_held_lock_blocks_until_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passwords.json");
    let store = CredentialStore::open(&path)
        .unwrap()
        .with_lock_timeout(Duration::from_millis(200));

    // another live process (this one) holds the lock
    let lock_path = dir.path().join("passwords.json.lock");
    fs::write(&lock_path, std::process::id().to_string()).unwrap();

    let err = store.save("mail", "secret").unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout { .. }));

    fs::remove_file(&lock_path).unwrap();
    store.save("mail", "secret").unwrap();
}

/// Body of the child processes spawned by `test_separate_processes_do_not_lose_writes`;
/// does nothing when run directly.
#[test]
fn test_child_process_writer() {
    let (Ok(path), Ok(writer)) = (env::var(CHILD_STORE_ENV), env::var(CHILD_WRITER_ENV)) else {
        return;
    };

    let store = CredentialStore::open(&path).unwrap();
    for n in 0..SAVES_PER_WRITER {
        store.save(&format!("process-{writer}-{n}"), "secret").unwrap();
    }
    store.save("shared", &format!("secret-{writer}")).unwrap();
}

#[test]
fn test_separate_processes_do_not_lose_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store").join("passwords.json");
    let exe = env::current_exe().unwrap();

    let children: Vec<_> = (0..PROCESSES)
        .map(|writer| {
            Command::new(&exe)
                .args(["test_child_process_writer", "--exact", "--quiet"])
                .env(CHILD_STORE_ENV, &path)
                .env(CHILD_WRITER_ENV, writer.to_string())
                .spawn()
                .unwrap()
        })
        .collect();
    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let raw = fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["entries"].as_array().unwrap().len(), PROCESSES * SAVES_PER_WRITER + 1);
    assert!(!dir.path().join("store").join("passwords.json.lock").exists());
}
