//! Integration tests for the descriptor store

use mixprint_store::{FeatureStore, PutOutcome, StoreError};
use std::fs::OpenOptions;
use std::io::Write;

fn store_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("descriptors.mps")
}

#[test]
fn put_then_get_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FeatureStore::create(store_path(&dir), 4, "combined-v1").unwrap();

    let values = vec![1.0, -2.5, 0.0, 7.25];
    assert_eq!(
        store.put("house", "track_a", &values).unwrap(),
        PutOutcome::Stored
    );
    assert!(store.has("house", "track_a"));
    assert_eq!(store.get("house", "track_a").unwrap(), values);
}

#[test]
fn second_put_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let store = FeatureStore::create(store_path(&dir), 2, "combined-v1").unwrap();

    store.put("house", "track_a", &[1.0, 2.0]).unwrap();
    let outcome = store.put("house", "track_a", &[9.0, 9.0]).unwrap();
    assert_eq!(outcome, PutOutcome::AlreadyExists);
    assert_eq!(store.get("house", "track_a").unwrap(), vec![1.0, 2.0]);
}

#[test]
fn survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    {
        let store = FeatureStore::create(&path, 3, "combined-v1").unwrap();
        store.put("house", "a", &[1.0, 2.0, 3.0]).unwrap();
        store.put("techno", "b", &[4.0, 5.0, 6.0]).unwrap();
    }
    let store = FeatureStore::open(&path).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.descriptor_version(), "combined-v1");
    assert_eq!(store.dim(), 3);
    assert_eq!(store.get("techno", "b").unwrap(), vec![4.0, 5.0, 6.0]);
    assert_eq!(store.list("house"), vec!["a".to_string()]);
    assert_eq!(
        store.categories(),
        vec!["house".to_string(), "techno".to_string()]
    );
}

#[test]
fn iter_all_preserves_commit_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = FeatureStore::create(store_path(&dir), 1, "v1").unwrap();
    for (i, id) in ["c", "a", "b"].iter().enumerate() {
        store.put("g", id, &[i as f64]).unwrap();
    }
    let all = store.iter_all().unwrap();
    let ids: Vec<&str> = all.iter().map(|d| d.track_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn rejects_wrong_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let store = FeatureStore::create(store_path(&dir), 3, "v1").unwrap();
    let err = store.put("g", "t", &[1.0, 2.0]).unwrap_err();
    assert!(matches!(
        err,
        StoreError::DimensionMismatch {
            expected: 3,
            got: 2
        }
    ));
}

#[test]
fn torn_tail_is_dropped_and_append_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    {
        let store = FeatureStore::create(&path, 2, "v1").unwrap();
        store.put("g", "committed", &[1.0, 2.0]).unwrap();
    }
    // Simulate a crash mid-append: half a record at the end of the file
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0x03, 0x00, b'g', 0xFF]).unwrap();
    }
    let store = FeatureStore::open(&path).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("g", "committed").unwrap(), vec![1.0, 2.0]);

    // The interrupted unit re-extracts and lands cleanly
    store.put("g", "interrupted", &[3.0, 4.0]).unwrap();
    drop(store);
    let store = FeatureStore::open(&path).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.get("g", "interrupted").unwrap(), vec![3.0, 4.0]);
}

#[test]
fn mid_file_corruption_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let header_end;
    {
        let store = FeatureStore::create(&path, 2, "v1").unwrap();
        header_end = path.metadata().unwrap().len() as usize;
        store.put("g", "a", &[1.0, 2.0]).unwrap();
        store.put("g", "b", &[3.0, 4.0]).unwrap();
    }
    // Flip a byte inside the first record's values:
    // record layout is len(cat)+cat + len(id)+id + dim + values
    let first_value = header_end + (2 + 1) + (2 + 1) + 4;
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[first_value + 3] ^= 0x01;
    std::fs::write(&path, &bytes).unwrap();

    match FeatureStore::open(&path) {
        Err(StoreError::Corrupt { .. }) => {}
        other => panic!("expected corruption error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn corrupted_dim_field_mid_file_is_fatal_and_drops_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let header_end;
    {
        let store = FeatureStore::create(&path, 2, "v1").unwrap();
        header_end = path.metadata().unwrap().len() as usize;
        store.put("g", "a", &[1.0, 2.0]).unwrap();
        store.put("g", "b", &[3.0, 4.0]).unwrap();
    }
    // Inflate the first record's dim field so its declared extent runs past
    // EOF; this must read as corruption, never as a torn tail that would
    // drop both committed records
    let dim_field = header_end + (2 + 1) + (2 + 1);
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[dim_field + 3] |= 0x40;
    std::fs::write(&path, &bytes).unwrap();

    match FeatureStore::open(&path) {
        Err(StoreError::Corrupt { .. }) => {}
        other => panic!("expected corruption error, got {:?}", other.map(|_| ())),
    }

    // The failed open must not have rewritten the file
    let after = std::fs::read(&path).unwrap();
    assert_eq!(after, bytes);

    // Restoring the byte brings both committed records back
    bytes[dim_field + 3] &= !0x40;
    std::fs::write(&path, &bytes).unwrap();
    let store = FeatureStore::open(&path).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.get("g", "a").unwrap(), vec![1.0, 2.0]);
    assert_eq!(store.get("g", "b").unwrap(), vec![3.0, 4.0]);
}

#[test]
fn json_export_lists_every_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let store = FeatureStore::create(store_path(&dir), 2, "combined-v1").unwrap();
    store.put("house", "a", &[1.0, 2.0]).unwrap();
    store.put("techno", "b", &[3.0, 4.0]).unwrap();

    let mut buf = Vec::new();
    store.export_json(&mut buf).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(parsed["descriptor_version"], "combined-v1");
    assert_eq!(parsed["dim"], 2);
    let descriptors = parsed["descriptors"].as_array().unwrap();
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0]["track_id"], "a");
    assert_eq!(descriptors[1]["category"], "techno");
}

#[test]
fn get_missing_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FeatureStore::create(store_path(&dir), 2, "v1").unwrap();
    assert!(matches!(
        store.get("g", "nope"),
        Err(StoreError::NotFound { .. })
    ));
}
