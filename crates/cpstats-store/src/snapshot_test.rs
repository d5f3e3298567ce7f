use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn store_in(dir: &tempfile::TempDir) -> SnapshotStore {
    SnapshotStore::new(dir.path().join("last_known_counts.json"))
}

const LEGACY: &str = r#"{
  "counts": {"Codeforces": 1200, "Toph": 50, "CSES": 300},
  "dates": {"Codeforces": "2026-01-01", "Toph": "2026-01-10"},
  "modes": {"Codeforces": "automatic", "Toph": "manual", "CSES": "bogus"},
  "ratings": {"Codeforces": 1900}
}"#;

#[test]
fn parses_legacy_file_with_defaults() {
    let snapshot = Snapshot::from_json(LEGACY).unwrap();

    let cf = snapshot.get("Codeforces").unwrap();
    assert_eq!(cf.count, 1200);
    assert_eq!(cf.date, date(2026, 1, 1));
    assert_eq!(cf.mode, UpdateMode::Automatic);
    assert_eq!(cf.last_solved, None);
    assert_eq!(cf.username, None);

    let toph = snapshot.get("Toph").unwrap();
    assert_eq!(toph.mode, UpdateMode::Manual);

    let cses = snapshot.get("CSES").unwrap();
    assert_eq!(cses.date, EPOCH, "missing date defaults to the epoch");
    assert_eq!(cses.mode, UpdateMode::Automatic, "unknown mode defaults to automatic");
}

#[test]
fn save_of_load_is_a_fixed_point() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), LEGACY).unwrap();

    let first = store.load();
    store.save(&first).unwrap();
    let second = store.load();
    store.save(&second).unwrap();
    let third = store.load();

    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[test]
fn unknown_top_level_keys_survive_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), LEGACY).unwrap();

    let mut snapshot = store.load();
    snapshot.record("Codeforces", 1210, date(2026, 2, 1), UpdateMode::Automatic, None);
    store.save(&snapshot).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw["ratings"]["Codeforces"], 1900);
    assert_eq!(raw["counts"]["Codeforces"], 1210);
    assert_eq!(raw["dates"]["Codeforces"], "2026-02-01");
    assert_eq!(raw["last_solved_dates"]["Codeforces"], "2026-02-01");
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(store_in(&dir).load().is_empty());
}

#[test]
fn malformed_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), "{ \"counts\": { \"Codeforces\": \"lots\" ").unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn first_record_sets_epoch_last_solved() {
    let mut snapshot = Snapshot::default();
    snapshot.record("Kattis", 40, date(2026, 3, 1), UpdateMode::Automatic, Some("me"));

    let entry = snapshot.get("Kattis").unwrap();
    assert_eq!(entry.last_solved, Some(EPOCH));
    assert_eq!(entry.username.as_deref(), Some("me"));
}

#[test]
fn increase_moves_last_solved_and_decrease_does_not() {
    let mut snapshot = Snapshot::default();
    snapshot.record("Beta", 100, date(2026, 1, 1), UpdateMode::Automatic, None);
    snapshot.record("Beta", 145, date(2026, 2, 1), UpdateMode::Automatic, None);
    assert_eq!(snapshot.get("Beta").unwrap().last_solved, Some(date(2026, 2, 1)));

    snapshot.record("Beta", 90, date(2026, 3, 1), UpdateMode::Automatic, None);
    let entry = snapshot.get("Beta").unwrap();
    assert_eq!(entry.count, 90, "lower counts overwrite");
    assert_eq!(entry.date, date(2026, 3, 1));
    assert_eq!(entry.last_solved, Some(date(2026, 2, 1)));
}

#[test]
fn record_keeps_username_when_not_given() {
    let mut snapshot = Snapshot::default();
    snapshot.record("SPOJ", 10, date(2026, 1, 1), UpdateMode::Automatic, Some("old"));
    snapshot.record("SPOJ", 11, date(2026, 1, 2), UpdateMode::Manual, None);
    assert_eq!(snapshot.get("SPOJ").unwrap().username.as_deref(), Some("old"));
}

#[test]
fn fallback_requires_matching_username() {
    let mut snapshot = Snapshot::default();
    snapshot.record("AtCoder", 77, date(2026, 1, 1), UpdateMode::Automatic, Some("Alice"));

    assert!(snapshot.fallback_for("AtCoder", "alice").is_some());
    assert!(snapshot.fallback_for("AtCoder", "bob").is_none());
    assert!(snapshot.get("AtCoder").is_some(), "entry itself is never dropped");
}

#[test]
fn fallback_accepts_entries_without_username() {
    let snapshot = Snapshot::from_json(LEGACY).unwrap();
    assert!(snapshot.fallback_for("Codeforces", "anyone").is_some());
}

#[test]
fn last_activity_ignores_epoch() {
    let mut snapshot = Snapshot::default();
    snapshot.record("A", 1, date(2026, 1, 1), UpdateMode::Automatic, None);
    assert_eq!(snapshot.last_activity(), None);

    snapshot.record("A", 2, date(2026, 1, 5), UpdateMode::Automatic, None);
    snapshot.record("B", 1, date(2026, 1, 3), UpdateMode::Automatic, None);
    snapshot.record("B", 3, date(2026, 1, 4), UpdateMode::Automatic, None);
    assert_eq!(snapshot.last_activity(), Some(("A", date(2026, 1, 5))));
}

#[test]
fn record_manual_sets_manual_mode_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store
        .record_manual(
            "Toph",
            50,
            date(2026, 1, 10),
            &SanityBounds::positive(10_000),
            Some("me"),
        )
        .unwrap();

    let entry = store.load().get("Toph").cloned().unwrap();
    assert_eq!(entry.count, 50);
    assert_eq!(entry.mode, UpdateMode::Manual);
    assert_eq!(entry.date, date(2026, 1, 10));
}

#[test]
fn record_manual_rejects_out_of_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let err = store
        .record_manual(
            "Toph",
            15_000,
            date(2026, 1, 10),
            &SanityBounds::positive(10_000),
            None,
        )
        .unwrap_err();

    assert!(matches!(err, StoreError::OutOfBounds { count: 15_000, .. }));
    assert!(!store.path().exists(), "nothing written on rejection");
}

#[test]
fn save_leaves_no_temporary_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let mut snapshot = Snapshot::default();
    snapshot.record("Vjudge", 400, date(2026, 1, 1), UpdateMode::Automatic, None);

    store.save(&snapshot).unwrap();
    store.save(&snapshot).unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("last_known_counts.json")]);
}

#[test]
fn save_into_missing_directory_fails_without_panic() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("missing").join("snap.json"));
    let err = store.save(&Snapshot::default()).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
}

#[test]
fn null_fields_degrade_one_value_at_a_time() {
    let content = r#"{
      "counts": {"Codeforces": 1200, "Toph": 50, "CSES": "300", "Kattis": null, "SPOJ": -4},
      "dates": {"Codeforces": "2026-01-01", "Toph": null, "CSES": 20260101},
      "modes": {"Codeforces": null, "Toph": "manual"},
      "usernames": {"Codeforces": "tourist", "Toph": null},
      "last_solved_dates": null
    }"#;

    let snapshot = Snapshot::from_json(content).unwrap();

    assert_eq!(snapshot.len(), 3);
    let cf = snapshot.get("Codeforces").unwrap();
    assert_eq!(cf.date, date(2026, 1, 1));
    assert_eq!(cf.mode, UpdateMode::Automatic);
    assert_eq!(cf.username.as_deref(), Some("tourist"));

    let toph = snapshot.get("Toph").unwrap();
    assert_eq!((toph.count, toph.date, toph.mode), (50, EPOCH, UpdateMode::Manual));
    assert_eq!(toph.username, None);

    let cses = snapshot.get("CSES").unwrap();
    assert_eq!((cses.count, cses.date), (300, EPOCH));

    assert!(snapshot.get("Kattis").is_none());
    assert!(snapshot.get("SPOJ").is_none());
}

#[test]
fn store_load_keeps_history_despite_null_values() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(
        store.path(),
        r#"{"counts": {"Codeforces": 1200, "Toph": 50},
            "dates": {"Codeforces": "2026-01-01", "Toph": null},
            "usernames": {"Codeforces": "tourist", "Toph": null}}"#,
    )
    .unwrap();

    let snapshot = store.load();
    assert_eq!(snapshot.len(), 2);

    store.save(&snapshot).unwrap();
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw["dates"]["Toph"], "1970-01-01");
    assert!(raw["usernames"].get("Toph").is_none());
}

#[test]
fn ratings_round_trip_and_replace_foreign_values() {
    let mut snapshot = Snapshot::from_json(LEGACY).unwrap();
    assert_eq!(snapshot.rating("Codeforces"), None, "a bare number is not a rating");

    let rating = Rating {
        current: Some(1850),
        max: Some(1920),
        rank: Some("expert".to_string()),
        max_rank: Some("candidate master".to_string()),
    };
    snapshot.set_rating("Codeforces", rating.clone());

    let json = snapshot.to_json().unwrap();
    let raw: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(raw["ratings"]["Codeforces"]["max_rank"], "candidate master");

    let reloaded = Snapshot::from_json(&json).unwrap();
    assert_eq!(reloaded.rating("Codeforces"), Some(&rating));
    assert_eq!(reloaded.ratings().count(), 1);
}

#[test]
fn unrated_fields_are_written_as_null() {
    let mut snapshot = Snapshot::default();
    snapshot.set_rating(
        "Codeforces",
        Rating {
            rank: Some("newbie".to_string()),
            ..Rating::default()
        },
    );
    let raw: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
    assert!(raw["ratings"]["Codeforces"]["current"].is_null());
    assert_eq!(raw["ratings"]["Codeforces"]["rank"], "newbie");
}
