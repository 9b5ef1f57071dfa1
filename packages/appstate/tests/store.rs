use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use appstate::consts::UUID_PORTAL2;
use appstate::records::PaletteState;
use appstate::{Identifier, RecordStatus, Settings, StateStore, StorageFormat, StoreError};

const A: &str = "5a1c2bd9e4f04f0c9d3d2a4a6f1b8e77";
const B: &str = "0123456789abcdef0123456789abcdef";

fn id(hex: &str) -> Identifier {
    Identifier::from_text(hex).unwrap()
}

fn write_legacy(dir: &Path) {
    fs::write(
        dir.join("config.ini"),
        format!("[General]\npalette_save_settings = 1\n\n[Last_Selected]\npalette_uuid = {A}\n"),
    )
    .unwrap();
}

#[test]
fn migrates_from_legacy_once() {
    let dir = tempfile::tempdir().unwrap();
    write_legacy(dir.path());
    let settings = Settings::new(dir.path());

    let mut store = StateStore::open(settings.clone()).unwrap();
    assert_eq!(store.report().migrated, vec!["Palette"]);
    assert_eq!(store.status(), vec![("Palette", RecordStatus::PendingMigration)]);

    let palette = store.load::<PaletteState>().unwrap();
    assert_eq!(palette.selected(), id(A));
    assert!(palette.save_settings());
    assert!(palette.hidden_defaults().is_empty());

    store.flush().unwrap();
    assert_eq!(store.status(), vec![("Palette", RecordStatus::Loaded)]);
    let text = fs::read_to_string(dir.path().join("config.vdf")).unwrap();
    assert!(text.contains(&format!("\"selected\" \"{A}\"")), "{text}");

    // Changing the legacy file no longer has any effect.
    fs::write(dir.path().join("config.ini"), "[General]\npalette_save_settings = 0\n").unwrap();
    let store = StateStore::open(settings).unwrap();
    assert_eq!(store.report().loaded, vec!["Palette"]);
    assert!(store.report().migrated.is_empty());
    assert!(store.load::<PaletteState>().unwrap().save_settings());
}

#[test]
fn empty_directory_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(Settings::new(dir.path().join("nested"))).unwrap();
    assert_eq!(*store.load::<PaletteState>().unwrap(), PaletteState::default());
    assert!(store.report().is_clean());
}

#[test]
fn save_and_reopen_in_each_format() {
    for format in [StorageFormat::Text, StorageFormat::Binary] {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::new(dir.path()).with_format(format);
        let state = PaletteState::new(id(B), true, [id(A), UUID_PORTAL2]);

        let mut store = StateStore::open(settings.clone()).unwrap();
        store.save(state.clone()).unwrap();
        assert!(settings.active_path().exists());
        assert!(!settings.path_for(format.other()).exists());

        let store = StateStore::open(settings).unwrap();
        assert_eq!(store.report().loaded, vec!["Palette"], "{format}");
        let loaded = store.load::<PaletteState>().unwrap();
        assert_eq!(*loaded, state);
        assert_eq!(loaded.hidden_defaults(), &BTreeSet::from([id(A)]));
    }
}

#[test]
fn switching_format_carries_data_over() {
    let dir = tempfile::tempdir().unwrap();
    let text = Settings::new(dir.path());
    let state = PaletteState::default().with_selected(id(A)).with_hidden(id(B));
    StateStore::open(text.clone()).unwrap().save(state.clone()).unwrap();

    let binary = text.clone().with_format(StorageFormat::Binary);
    let mut store = StateStore::open(binary.clone()).unwrap();
    assert_eq!(store.report().loaded, vec!["Palette"]);
    assert_eq!(*store.load::<PaletteState>().unwrap(), state);
    store.flush().unwrap();

    // The binary file now wins even if the text one changes.
    let newer = state.with_save_settings(true);
    StateStore::open(text).unwrap().save(newer).unwrap();
    let store = StateStore::open(binary).unwrap();
    assert_eq!(*store.load::<PaletteState>().unwrap(), state);
}

#[test]
fn convert_writes_the_new_format() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::new(dir.path());
    let mut store = StateStore::open(settings.clone()).unwrap();
    store.save(PaletteState::default().with_selected(id(B))).unwrap();

    store.convert(StorageFormat::Binary).unwrap();
    assert_eq!(store.settings().format, StorageFormat::Binary);
    let dmx = fs::read(settings.path_for(StorageFormat::Binary)).unwrap();
    assert_eq!(&dmx[..4], b"ASEG");
    assert!(settings.path_for(StorageFormat::Text).exists());
}

#[test]
fn staged_changes_reach_disk_on_flush() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::new(dir.path());
    let mut store = StateStore::open(settings.clone()).unwrap();

    store.stage(PaletteState::default().with_selected(id(A))).unwrap();
    store.stage(PaletteState::default().with_selected(id(B))).unwrap();
    assert_eq!(store.load::<PaletteState>().unwrap().selected(), id(B));
    assert!(!settings.active_path().exists());

    store.flush().unwrap();
    let store = StateStore::open(settings).unwrap();
    assert_eq!(store.load::<PaletteState>().unwrap().selected(), id(B));
}

#[test]
fn newer_version_is_isolated_and_preserved() {
    let dir = tempfile::tempdir().unwrap();
    write_legacy(dir.path());
    let original = format!(
        "\"Palette\"\n\t{{\n\t\"_version\" \"5\"\n\t\"selected\" \"{A}\"\n\t\"future\" \"yes\"\n\t}}\n"
    );
    let vdf = dir.path().join("config.vdf");
    fs::write(&vdf, &original).unwrap();

    let mut store = StateStore::open(Settings::new(dir.path())).unwrap();
    assert_eq!(store.report().failed.len(), 1);
    assert!(store.report().migrated.is_empty(), "must not migrate over newer data");

    let err = store.load::<PaletteState>().unwrap_err();
    assert!(err.is_version_error(), "{err}");
    assert!(matches!(err, StoreError::Record { .. }));

    store.flush().unwrap();
    assert_eq!(fs::read_to_string(&vdf).unwrap(), original);
}

#[test]
fn syntax_errors_are_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.vdf"), "\"Palette\"\n{\n\"selected\" \"x\"\n").unwrap();
    let err = StateStore::open(Settings::new(dir.path())).err().unwrap();
    assert!(matches!(err, StoreError::Container { .. }), "{err}");
    assert!(err.to_string().contains("line 2"), "{err}");
}

#[test]
fn corrupt_binary_header_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.dmx"), b"NOPE\x01\x00\x00\x00").unwrap();
    let settings = Settings::new(dir.path()).with_format(StorageFormat::Binary);
    assert!(matches!(
        StateStore::open(settings),
        Err(StoreError::Container { .. })
    ));
}

#[test]
fn malformed_fields_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("config.vdf"),
        format!(
            "\"palette\"\n{{\n\"selected\" \"nope\"\n\"save_settings\" \"maybe\"\n\"hidden\" \"{A}\"\n\"hidden\" \"bad\"\n}}\n\"Unknown\" {{ \"a\" \"b\" }}\n"
        ),
    )
    .unwrap();
    let store = StateStore::open(Settings::new(dir.path())).unwrap();
    assert!(store.report().is_clean());
    let palette = store.load::<PaletteState>().unwrap();
    assert_eq!(palette.selected(), UUID_PORTAL2);
    assert!(!palette.save_settings());
    assert_eq!(palette.hidden_defaults(), &BTreeSet::from([id(A)]));
}

#[test]
fn legacy_file_is_never_written() {
    let dir = tempfile::tempdir().unwrap();
    write_legacy(dir.path());
    let before = fs::read(dir.path().join("config.ini")).unwrap();

    let mut store = StateStore::open(Settings::new(dir.path())).unwrap();
    store.save(PaletteState::default()).unwrap();
    store.convert(StorageFormat::Binary).unwrap();

    assert_eq!(fs::read(dir.path().join("config.ini")).unwrap(), before);
}

#[test]
fn json_dump() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(Settings::new(dir.path())).unwrap();
    let json = store.dump_json().unwrap();
    assert_eq!(json["Palette"]["selected"], UUID_PORTAL2.to_text());
    assert_eq!(json["Palette"]["hidden_defaults"], serde_json::json!([]));
    assert_eq!(store.record_json("PALETTE").unwrap(), json["Palette"]);
}
