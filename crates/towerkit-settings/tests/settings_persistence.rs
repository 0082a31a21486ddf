use std::path::PathBuf;
use tempfile::TempDir;
use towerkit_settings::{RangeEntry, Settings, SettingsStore, DESCRIPTIONS_FILE_NAME};

fn invalid_settings() -> Settings {
    let mut settings = Settings::for_range("does/not/exist.gcode", 230, 180);
    settings.set_indexed("temperature", 1, "2O0").unwrap();
    settings.step = 0;
    settings.level_cap = -3;
    settings.wait_for_temperature = false;
    settings
}

#[test]
fn test_json_round_trip_keeps_invalid_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let mut store = SettingsStore::new(&path);
    *store.settings_mut() = invalid_settings();
    assert!(store.validate().is_err());
    store.save().unwrap();

    let loaded = SettingsStore::open(&path).unwrap();
    assert_eq!(loaded.settings(), &invalid_settings());
}

#[test]
fn test_toml_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");

    let mut store = SettingsStore::new(&path);
    store.set("template_path", "towers/petg.gcode").unwrap();
    store.set_indexed("temperature", 0, "230").unwrap();
    store.set_indexed("temperature", 1, "250").unwrap();
    store.set("step", "4").unwrap();
    store.save().unwrap();

    let loaded = SettingsStore::open(&path).unwrap();
    assert_eq!(loaded.settings(), store.settings());
    assert_eq!(loaded.get("step").unwrap(), "4");
    assert_eq!(
        loaded.settings().template_path,
        PathBuf::from("towers/petg.gcode")
    );
}

#[test]
fn test_round_trip_preserves_text_that_looks_numeric() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let mut settings = Settings::default();
    settings.temperature_range = [RangeEntry::Text("190".to_string()), RangeEntry::Degrees(210)];
    settings.save_to_file(&path).unwrap();

    let loaded = Settings::load_from_file(&path).unwrap();
    assert_eq!(loaded, settings);
    assert_eq!(loaded.temperature_range[0].degrees(), Some(190));
}

#[test]
fn test_integers_persist_as_json_numbers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    Settings::for_range("tower.gcode", 190, 210)
        .save_to_file(&path)
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["temperature_range"], serde_json::json!([190, 210]));
    assert_eq!(json["step"], serde_json::json!(5));
    assert_eq!(json["level_cap"], serde_json::json!(10));
    assert_eq!(json["template_path"], serde_json::json!("tower.gcode"));
}

#[test]
fn test_missing_fields_take_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{ "temperature_range": [200, 220] }"#).unwrap();

    let store = SettingsStore::open(&path).unwrap();
    let settings = store.settings();
    assert_eq!(settings.temperature_range[0], RangeEntry::Degrees(200));
    assert_eq!(settings.step, 5);
    assert_eq!(settings.level_cap, 10);
    assert_eq!(settings.template_path, PathBuf::from("tower.gcode"));
}

#[test]
fn test_load_replaces_in_memory_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let mut store = SettingsStore::new(&path);
    store.set("step", "2").unwrap();
    store.save().unwrap();

    store.set("step", "7").unwrap();
    store.load().unwrap();
    assert_eq!(store.get("step").unwrap(), "2");
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(SettingsStore::open(&path).is_err());
}

#[test]
fn test_descriptions_written_once() {
    let dir = TempDir::new().unwrap();
    let store = SettingsStore::new(dir.path().join("settings.json"));
    let descriptions = dir.path().join(DESCRIPTIONS_FILE_NAME);

    assert!(store.write_descriptions_once().unwrap());
    let first = std::fs::read_to_string(&descriptions).unwrap();
    assert!(first.contains("- level_cap: (int)"));

    std::fs::write(&descriptions, "edited by hand").unwrap();
    assert!(!store.write_descriptions_once().unwrap());
    assert_eq!(
        std::fs::read_to_string(&descriptions).unwrap(),
        "edited by hand"
    );
}
