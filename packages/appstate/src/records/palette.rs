//! The palette selection record.

use std::collections::{BTreeMap, BTreeSet};

use appstate_core::{conv, Error, Identifier, LegacySource, Node, Record, SchemaVersion, Value};
use serde::Serialize;

use crate::consts::{PALETTE_FORCE_SHOWN, UUID_PORTAL2};

/// Which palette is selected, and which built-in palettes are hidden.
///
/// Immutable: the `with_*` methods return an updated copy. Construction
/// always enforces that the selected palette and the force-shown palettes are
/// not hidden, by dropping them from the hidden set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaletteState {
    selected: Identifier,
    save_settings: bool,
    hidden_defaults: BTreeSet<Identifier>,
}

impl Default for PaletteState {
    fn default() -> Self {
        Self::new(UUID_PORTAL2, false, BTreeSet::new())
    }
}

impl PaletteState {
    pub fn new(
        selected: Identifier,
        save_settings: bool,
        hidden_defaults: impl IntoIterator<Item = Identifier>,
    ) -> Self {
        let hidden_defaults = hidden_defaults
            .into_iter()
            .filter(|id| *id != selected && !PALETTE_FORCE_SHOWN.contains(id))
            .collect();
        Self {
            selected,
            save_settings,
            hidden_defaults,
        }
    }

    pub fn selected(&self) -> Identifier {
        self.selected
    }

    /// Whether palettes also store the item settings.
    pub fn save_settings(&self) -> bool {
        self.save_settings
    }

    pub fn hidden_defaults(&self) -> &BTreeSet<Identifier> {
        &self.hidden_defaults
    }

    pub fn is_hidden(&self, id: Identifier) -> bool {
        self.hidden_defaults.contains(&id)
    }

    /// Select another palette. It is unhidden if it was hidden.
    pub fn with_selected(&self, selected: Identifier) -> Self {
        Self::new(selected, self.save_settings, self.hidden_defaults.iter().copied())
    }

    pub fn with_save_settings(&self, save_settings: bool) -> Self {
        Self::new(self.selected, save_settings, self.hidden_defaults.iter().copied())
    }

    /// Hide a palette. Hiding the selected or a force-shown palette does nothing.
    pub fn with_hidden(&self, id: Identifier) -> Self {
        let hidden = self.hidden_defaults.iter().copied().chain([id]);
        Self::new(self.selected, self.save_settings, hidden)
    }

    pub fn with_unhidden(&self, id: Identifier) -> Self {
        let hidden = self.hidden_defaults.iter().copied().filter(|h| *h != id);
        Self::new(self.selected, self.save_settings, hidden)
    }
}

/// Decode every `hidden` entry, skipping the ones that are not identifiers.
fn collect_hidden(
    data: &dyn Node,
    decode: fn(&Value) -> Result<Identifier, appstate_core::DecodeError>,
) -> Vec<Identifier> {
    data.each("hidden")
        .filter_map(|v| match decode(v) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Palette: ignoring hidden palette entry: {}", e);
                None
            }
        })
        .collect()
}

impl Record for PaletteState {
    const NAME: &'static str = "Palette";
    const VERSION: SchemaVersion = SchemaVersion::V1;

    fn from_legacy(source: &dyn LegacySource) -> BTreeMap<String, Self> {
        let selected = source
            .get("Last_Selected", "palette_uuid")
            .and_then(|s| Identifier::from_text(s).ok())
            .unwrap_or(UUID_PORTAL2);
        let save_settings = source
            .get_bool("General", "palette_save_settings")
            .unwrap_or(false);
        BTreeMap::from([(
            String::new(),
            Self::new(selected, save_settings, BTreeSet::new()),
        )])
    }

    fn parse_text(data: &dyn Node, version: SchemaVersion) -> Result<Self, Error> {
        Self::VERSION.require(Self::NAME, version)?;

        let selected = data
            .get("selected")
            .and_then(|v| Identifier::from_text_value(v).ok())
            .unwrap_or(UUID_PORTAL2);
        let save_settings = data
            .get("save_settings")
            .and_then(Value::as_str)
            .and_then(conv::parse_bool)
            .unwrap_or(false);
        let hidden = collect_hidden(data, Identifier::from_text_value);

        Ok(Self::new(selected, save_settings, hidden))
    }

    fn export_text(&self, out: &mut dyn Node) {
        out.set("selected", self.selected.to_text_value());
        out.set(
            "save_settings",
            Value::Integer(conv::bool_as_int(self.save_settings)),
        );
        out.set(
            "hidden",
            Value::Array(
                self.hidden_defaults
                    .iter()
                    .map(Identifier::to_text_value)
                    .collect(),
            ),
        );
    }

    fn parse_binary(data: &dyn Node, version: SchemaVersion) -> Result<Self, Error> {
        Self::VERSION.require(Self::NAME, version)?;

        let selected = data
            .get("selected")
            .and_then(|v| Identifier::from_binary_value(v).ok())
            .unwrap_or(UUID_PORTAL2);
        let save_settings = data
            .get("save_settings")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let hidden = collect_hidden(data, Identifier::from_binary_value);

        Ok(Self::new(selected, save_settings, hidden))
    }

    fn export_binary(&self, out: &mut dyn Node) {
        out.set("selected", self.selected.to_binary_value());
        out.set("save_settings", Value::Bool(self.save_settings));
        out.set(
            "hidden",
            Value::Array(
                self.hidden_defaults
                    .iter()
                    .map(Identifier::to_binary_value)
                    .collect(),
            ),
        );
    }
}
