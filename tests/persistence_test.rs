use gridlog::persistence::{StateDocument, StatePublisher, atomic_write, atomic_write_with};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn doc(last_updated: i64) -> StateDocument {
    StateDocument {
        grid: Some(-150),
        solar: Some(901),
        powerwall: Some(-50),
        home: Some(701),
        grid_up: true,
        percentage: Some(76.3),
        last_updated,
    }
}

fn leftover_temp_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('.'))
        .collect()
}

#[test]
fn publish_writes_pretty_json_with_expected_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let publisher = StatePublisher::new(&path);

    assert!(publisher.load().unwrap().is_none());
    publisher.publish(&doc(1_700_000_000)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.ends_with("}\n"));
    assert!(text.contains("\n  \"grid\": -150,"));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let keys: Vec<&str> = value
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    for key in [
        "grid",
        "solar",
        "powerwall",
        "home",
        "grid_up",
        "percentage",
        "last_updated",
    ] {
        assert!(keys.contains(&key), "missing key {}", key);
    }
    assert_eq!(keys.len(), 7);
    assert_eq!(publisher.load().unwrap(), Some(doc(1_700_000_000)));
    assert!(leftover_temp_files(dir.path()).is_empty());
}

#[test]
fn unknown_flows_are_json_null() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut d = doc(5);
    d.solar = None;
    d.percentage = None;
    StatePublisher::new(&path).publish(&d).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(value["solar"].is_null());
    assert!(value["percentage"].is_null());
    assert_eq!(value["home"], 701);
}

#[test]
fn failed_write_keeps_previous_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let publisher = StatePublisher::new(&path);
    publisher.publish(&doc(1)).unwrap();

    let err = atomic_write_with(&path, |file| {
        file.write_all(b"{\"grid\": ")?;
        Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"))
    })
    .unwrap_err();

    assert!(err.to_string().starts_with("Publish error"));
    assert_eq!(publisher.load().unwrap(), Some(doc(1)));
    assert!(leftover_temp_files(dir.path()).is_empty());
}

#[test]
fn publish_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("state.json");
    let err = StatePublisher::new(&path).publish(&doc(1)).unwrap_err();
    assert!(err.to_string().contains("temporary file"));
    assert!(!path.exists());
}

#[test]
fn atomic_write_replaces_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("current.txt");
    atomic_write(&path, b"a much longer first version\n").unwrap();
    atomic_write(&path, b"short\n").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "short\n");
}

#[cfg(unix)]
#[test]
fn existing_permissions_are_carried_forward() {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, b"{}").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
    let before = fs::metadata(&path).unwrap();

    StatePublisher::new(&path).publish(&doc(2)).unwrap();

    let after = fs::metadata(&path).unwrap();
    assert_eq!(after.mode() & 0o7777, 0o640);
    assert_eq!(after.uid(), before.uid());
    assert_eq!(after.gid(), before.gid());
    assert_ne!(after.ino(), before.ino());
}

#[test]
fn concurrent_reader_never_sees_partial_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let publisher = StatePublisher::new(&path);
    publisher.publish(&doc(0)).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let done = Arc::clone(&done);
        let path = path.clone();
        std::thread::spawn(move || {
            let mut reads = 0u64;
            let mut last_seen = 0i64;
            loop {
                let finished = done.load(Ordering::Acquire);
                let text = fs::read_to_string(&path).expect("state file must always exist");
                let parsed: StateDocument =
                    serde_json::from_str(&text).expect("state file must always be complete");
                assert!(parsed.last_updated >= last_seen);
                last_seen = parsed.last_updated;
                reads += 1;
                if finished {
                    break;
                }
            }
            reads
        })
    };

    for i in 1..=300 {
        publisher.publish(&doc(i)).unwrap();
    }
    done.store(true, Ordering::Release);

    let reads = reader.join().unwrap();
    assert!(reads > 0);
    assert_eq!(publisher.load().unwrap(), Some(doc(300)));
    assert!(leftover_temp_files(dir.path()).is_empty());
}
