use appstate::records::PaletteState;
use appstate::{Result, Settings, StateStore};
use serde_json::json;

use crate::cli::{Cli, Command, PaletteCommand};

/// Apply command-line overrides on top of environment settings.
fn apply_overrides(cli: &Cli, mut settings: Settings) -> Settings {
    if let Some(dir) = &cli.dir {
        settings.dir = dir.clone();
    }
    if let Some(format) = cli.format {
        settings.format = format;
    }
    if let Some(legacy) = &cli.legacy {
        settings.legacy_file = Some(legacy.clone());
    }
    settings
}

pub fn run(cli: Cli) -> Result<Option<String>> {
    let settings = apply_overrides(&cli, Settings::from_env()?);
    execute(cli.command, settings)
}

/// Run one command. Returns what should be printed to stdout.
pub fn execute(command: Command, settings: Settings) -> Result<Option<String>> {
    tracing::debug!(?settings, "Running {:?}", command);

    let output = match command {
        Command::Settings => serde_json::to_value(&settings)?,
        Command::Show { name } => {
            let store = StateStore::open(settings)?;
            match name {
                Some(name) => store.record_json(&name)?,
                None => store.dump_json()?,
            }
        }
        Command::Migrate => {
            let mut store = StateStore::open(settings)?;
            store.flush()?;
            let report = store.report();
            let failed: Vec<_> = report
                .failed
                .iter()
                .map(|(name, error)| json!({ "record": name, "error": error.to_string() }))
                .collect();
            json!({
                "path": store.settings().active_path().display().to_string(),
                "loaded": report.loaded,
                "migrated": report.migrated,
                "failed": failed,
            })
        }
        Command::Convert { to } => {
            let mut store = StateStore::open(settings)?;
            store.convert(to)?;
            tracing::info!("Wrote {}", store.settings().active_path().display());
            return Ok(None);
        }
        Command::Palette(cmd) => {
            let mut store = StateStore::open(settings)?;
            let palette = store.load::<PaletteState>()?;
            let updated = match cmd {
                PaletteCommand::Select { id } => palette.with_selected(id),
                PaletteCommand::Hide { id } => {
                    let updated = palette.with_hidden(id);
                    if !updated.is_hidden(id) {
                        tracing::warn!("Palette {} cannot be hidden", id);
                    }
                    updated
                }
                PaletteCommand::Unhide { id } => palette.with_unhidden(id),
                PaletteCommand::SaveSettings { enabled } => palette.with_save_settings(enabled),
            };
            store.save(updated)?;
            store.record_json("Palette")?
        }
    };
    Ok(Some(serde_json::to_string_pretty(&output)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use appstate::consts::UUID_PORTAL2;
    use appstate::{Identifier, StorageFormat};
    use clap::Parser;
    use std::path::PathBuf;

    const A: Identifier = Identifier::from_u128(0xa);

    fn run_in(dir: &std::path::Path, command: Command) -> serde_json::Value {
        let out = execute(command, Settings::new(dir)).unwrap().unwrap();
        serde_json::from_str(&out).unwrap()
    }

    #[test]
    fn overrides_beat_environment() {
        let cli = Cli::try_parse_from([
            "appstate", "--dir", "/x", "--format", "binary", "--legacy", "/y.ini", "settings",
        ])
        .unwrap();
        let settings = apply_overrides(&cli, Settings::new("/env"));
        assert_eq!(settings.dir, PathBuf::from("/x"));
        assert_eq!(settings.format, StorageFormat::Binary);
        assert_eq!(settings.legacy_path(), PathBuf::from("/y.ini"));

        let cli = Cli::try_parse_from(["appstate", "settings"]).unwrap();
        assert_eq!(apply_overrides(&cli, Settings::new("/env")), Settings::new("/env"));
    }

    #[test]
    fn palette_edits_persist() {
        let dir = tempfile::tempdir().unwrap();
        run_in(dir.path(), Command::Palette(PaletteCommand::Select { id: A }));
        run_in(dir.path(), Command::Palette(PaletteCommand::Hide { id: A }));
        let out = run_in(
            dir.path(),
            Command::Palette(PaletteCommand::SaveSettings { enabled: true }),
        );
        assert_eq!(out["selected"], A.to_text());
        assert_eq!(out["save_settings"], true);
        assert_eq!(out["hidden_defaults"], json!([]));

        let shown = run_in(dir.path(), Command::Show { name: None });
        assert_eq!(shown["Palette"], out);
    }

    #[test]
    fn hiding_force_shown_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_in(
            dir.path(),
            Command::Palette(PaletteCommand::Hide { id: UUID_PORTAL2 }),
        );
        assert_eq!(out["hidden_defaults"], json!([]));
    }

    #[test]
    fn migrate_reports_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ini"),
            "[General]\npalette_save_settings = true\n",
        )
        .unwrap();

        let out = run_in(dir.path(), Command::Migrate);
        assert_eq!(out["migrated"], json!(["Palette"]));
        assert!(dir.path().join("config.vdf").exists());

        let out = run_in(dir.path(), Command::Migrate);
        assert_eq!(out["loaded"], json!(["Palette"]));
        assert_eq!(out["migrated"], json!([]));
    }

    #[test]
    fn convert_then_show() {
        let dir = tempfile::tempdir().unwrap();
        run_in(dir.path(), Command::Palette(PaletteCommand::Select { id: A }));
        let printed = execute(
            Command::Convert {
                to: StorageFormat::Binary,
            },
            Settings::new(dir.path()),
        )
        .unwrap();
        assert!(printed.is_none());
        assert!(dir.path().join("config.dmx").exists());

        let settings = Settings::new(dir.path()).with_format(StorageFormat::Binary);
        let out = execute(Command::Show { name: Some("palette".into()) }, settings)
            .unwrap()
            .unwrap();
        let out: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["selected"], A.to_text());
    }

    #[test]
    fn unknown_record_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute(
            Command::Show {
                name: Some("Nope".into()),
            },
            Settings::new(dir.path()),
        );
        assert!(result.is_err());
    }
}
