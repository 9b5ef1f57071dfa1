use std::path::PathBuf;

use appstate::{Identifier, StorageFormat};
use clap::{ArgAction, Parser, Subcommand};

/// appstate - inspect, migrate and edit persisted application state
#[derive(Parser, Debug)]
#[command(name = "appstate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config directory (default: $APPSTATE_DIR, then the user config dir)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Active storage format: text or binary (default: $APPSTATE_FORMAT, then text)
    #[arg(long, global = true)]
    pub format: Option<StorageFormat>,

    /// Legacy INI file to migrate from (default: config.ini in the config dir)
    #[arg(long, global = true)]
    pub legacy: Option<PathBuf>,

    /// More log output; repeat for more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less log output; repeat for less
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print loaded records as JSON
    Show {
        /// Only this record
        name: Option<String>,
    },
    /// Load everything (migrating legacy values) and write the active format
    Migrate,
    /// Rewrite all records in another format and make it the active one
    Convert {
        #[arg(long)]
        to: StorageFormat,
    },
    /// Edit the palette record
    #[command(subcommand)]
    Palette(PaletteCommand),
    /// Print the effective settings as JSON
    Settings,
}

#[derive(Subcommand, Debug)]
pub enum PaletteCommand {
    /// Select a palette
    Select { id: Identifier },
    /// Hide a built-in palette
    Hide { id: Identifier },
    /// Show a hidden palette again
    Unhide { id: Identifier },
    /// Whether palettes also store item settings
    SaveSettings {
        #[arg(value_parser = parse_flag, action = ArgAction::Set)]
        enabled: bool,
    },
}

fn parse_flag(s: &str) -> Result<bool, String> {
    appstate_core::conv::parse_bool(s).ok_or_else(|| format!("not a boolean: {:?}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_anywhere() {
        let cli = Cli::try_parse_from([
            "appstate", "show", "--dir", "/tmp/x", "--format", "binary", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cli.format, Some(StorageFormat::Binary));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Show { name: None }));
    }

    #[test]
    fn palette_commands() {
        let cli = Cli::try_parse_from([
            "appstate",
            "palette",
            "select",
            "00000000000000000000000000000002",
        ])
        .unwrap();
        match cli.command {
            Command::Palette(PaletteCommand::Select { id }) => {
                assert_eq!(id, Identifier::from_u128(2))
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::try_parse_from(["appstate", "palette", "save-settings", "yes"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Palette(PaletteCommand::SaveSettings { enabled: true })
        ));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Cli::try_parse_from(["appstate", "palette", "hide", "xyz"]).is_err());
        assert!(Cli::try_parse_from(["appstate", "convert", "--to", "xml"]).is_err());
        assert!(Cli::try_parse_from(["appstate", "palette", "save-settings", "maybe"]).is_err());
    }
}
