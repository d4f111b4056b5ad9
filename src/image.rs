//! Image resolution port.
//!
//! Canonical entities always carry a displayable image reference. Resolution
//! prefers bundled assets, then the generator-supplied URL, then a
//! deterministic placeholder.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const PLACEHOLDER_BASE: &str = "https://placehold.co/96x96/png";

const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.ron");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Creature,
    Item,
}

impl AssetKind {
    fn dir(self) -> &'static str {
        match self {
            AssetKind::Creature => "pokemon",
            AssetKind::Item => "items",
        }
    }
}

pub trait ImageResolver {
    fn resolve(&self, kind: AssetKind, display_name: &str, external_url: Option<&str>) -> String;
}

impl<T: ImageResolver + ?Sized> ImageResolver for &T {
    fn resolve(&self, kind: AssetKind, display_name: &str, external_url: Option<&str>) -> String {
        (**self).resolve(kind, display_name, external_url)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(String),
}

/// Local asset table: display-name keys map to file names under `base_url/<kind dir>/`.
/// Only files listed in `available` are ever referenced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssetCatalog {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub creatures: BTreeMap<String, String>,
    #[serde(default)]
    pub items: BTreeMap<String, String>,
    #[serde(default)]
    pub available: BTreeSet<String>,
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AssetCatalog {
    pub fn empty() -> Self {
        Self {
            base_url: default_base_url(),
            creatures: BTreeMap::new(),
            items: BTreeMap::new(),
            available: BTreeSet::new(),
        }
    }

    pub fn builtin() -> Self {
        Self::from_ron(BUILTIN_CATALOG).unwrap_or_else(|err| {
            debug!(error = %err, "bundled catalog unreadable");
            Self::empty()
        })
    }

    pub fn from_ron(source: &str) -> Result<Self, CatalogError> {
        ron::de::from_str(source).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_ron(&source)
    }

    fn table(&self, kind: AssetKind) -> &BTreeMap<String, String> {
        match kind {
            AssetKind::Creature => &self.creatures,
            AssetKind::Item => &self.items,
        }
    }

    fn local_reference(&self, kind: AssetKind, file: &str) -> Option<String> {
        let relative = format!("{}/{}", kind.dir(), file);
        if !self.available.contains(&relative) {
            return None;
        }
        Some(format!("{}/{}", self.base_url.trim_end_matches('/'), relative))
    }
}

impl ImageResolver for AssetCatalog {
    fn resolve(&self, kind: AssetKind, display_name: &str, external_url: Option<&str>) -> String {
        let key = asset_key(display_name);
        if let Some(file) = self.table(kind).get(&key) {
            if let Some(local) = self.local_reference(kind, file) {
                return local;
            }
        }

        if let Some(url) = external_url.map(str::trim).filter(|url| !url.is_empty()) {
            if let Some(local) = file_name(url).and_then(|file| self.local_reference(kind, file)) {
                return local;
            }
            return url.to_string();
        }

        placeholder(display_name)
    }
}

pub fn placeholder(display_name: &str) -> String {
    let initial = display_name
        .trim()
        .chars()
        .next()
        .map(|ch| ch.to_uppercase().collect::<String>())
        .unwrap_or_else(|| "?".to_string());
    format!("{}?text={}", PLACEHOLDER_BASE, urlencoding::encode(&initial))
}

/// `"Poké Ball"` and `"poke_ball"` both become `"poke-ball"`.
pub fn asset_key(display_name: &str) -> String {
    let mut key = String::with_capacity(display_name.len());
    for ch in display_name.trim().chars() {
        match ch {
            ' ' | '_' | '-' => {
                if !key.is_empty() && !key.ends_with('-') {
                    key.push('-');
                }
            }
            'é' | 'É' => key.push('e'),
            '.' | '\'' => {}
            _ => key.extend(ch.to_lowercase()),
        }
    }
    key.trim_end_matches('-').to_string()
}

fn file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let file = path.rsplit('/').next()?;
    if file.is_empty() {
        None
    } else {
        Some(file)
    }
}

fn default_base_url() -> String {
    "/assets".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_parses() {
        let catalog = AssetCatalog::from_ron(BUILTIN_CATALOG).unwrap();
        assert_eq!(catalog.creatures.get("pikachu").map(String::as_str), Some("25.png"));
        assert!(catalog.available.contains("items/potion.png"));
    }

    #[test]
    fn local_asset_wins_over_external_url() {
        let catalog = AssetCatalog::builtin();
        let image = catalog.resolve(
            AssetKind::Creature,
            "Pikachu",
            Some("https://cdn.example.com/pikachu.png"),
        );
        assert_eq!(image, "/assets/pokemon/25.png");
    }

    #[test]
    fn external_url_rewritten_when_file_is_bundled() {
        let catalog = AssetCatalog::builtin();
        let image = catalog.resolve(
            AssetKind::Creature,
            "Sparky",
            Some("https://raw.example.com/sprites/pokemon/25.png?v=2"),
        );
        assert_eq!(image, "/assets/pokemon/25.png");
    }

    #[test]
    fn unknown_external_url_passes_through() {
        let catalog = AssetCatalog::builtin();
        let image = catalog.resolve(
            AssetKind::Item,
            "Moon Stone",
            Some(" https://x.test/moon.png "),
        );
        assert_eq!(image, "https://x.test/moon.png");
    }

    #[test]
    fn placeholder_uses_initial() {
        let catalog = AssetCatalog::empty();
        assert_eq!(
            catalog.resolve(AssetKind::Creature, "eevee", None),
            "https://placehold.co/96x96/png?text=E"
        );
        assert_eq!(
            catalog.resolve(AssetKind::Item, "  ", Some("")),
            "https://placehold.co/96x96/png?text=%3F"
        );
    }

    #[test]
    fn asset_keys_fold_spelling() {
        assert_eq!(asset_key("Poké Ball"), "poke-ball");
        assert_eq!(asset_key("super_potion"), "super-potion");
        assert_eq!(asset_key(" Mr. Mime "), "mr-mime");
    }

    #[test]
    fn resolution_is_stable_on_its_own_output() {
        let catalog = AssetCatalog::builtin();
        let first = catalog.resolve(AssetKind::Item, "Potion", None);
        let second = catalog.resolve(AssetKind::Item, "Potion", Some(&first));
        assert_eq!(first, second);
    }
}
