use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Screen rectangle `[x1, y1, x2, y2]` a template is searched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct SearchArea {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl From<[u32; 4]> for SearchArea {
    fn from([x1, y1, x2, y2]: [u32; 4]) -> Self {
        SearchArea { x1, y1, x2, y2 }
    }
}

impl From<SearchArea> for [u32; 4] {
    fn from(a: SearchArea) -> Self {
        [a.x1, a.y1, a.x2, a.y2]
    }
}

impl SearchArea {
    /// Clamp to a `width`×`height` screen. Returns `None` when nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<SearchArea> {
        let x1 = self.x1.min(width);
        let y1 = self.y1.min(height);
        let x2 = self.x2.min(width).max(x1);
        let y2 = self.y2.min(height).max(y1);
        if x2 == x1 || y2 == y1 {
            return None;
        }
        Some(SearchArea { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiElement {
    pub image_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_area: Option<SearchArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
}

/// On-disk UI configuration. Sections this program does not know about are
/// kept in `extra` so a rewrite does not drop them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub ui_elements: BTreeMap<String, UiElement>,
    /// Element names tried in order after a coordinate search to spot a ruin.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ruin_markers: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UiConfig {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("invalid UI config JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Load, falling back to an empty config when the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(
                    "loaded {} UI element(s) from {}",
                    config.ui_elements.len(),
                    path.display()
                );
                config
            }
            Err(e) => {
                tracing::warn!("UI config unavailable, starting empty: {e:#}");
                UiConfig::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize UI config")?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn element(&self, name: &str) -> Option<&UiElement> {
        self.ui_elements.get(name)
    }

    pub fn upsert(&mut self, name: &str, element: UiElement) {
        self.ui_elements.insert(name.to_string(), element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "game_package": "com.example.game",
        "ui_elements": {
            "map_button": {
                "image_path": "resource/map_button.png",
                "search_area": [0, 600, 200, 720],
                "threshold": 0.6
            },
            "Castle": { "image_path": "resource/Castle.png" }
        },
        "bot_settings": { "loop_delay": 30 }
    }"#;

    #[test]
    fn test_parse_elements() {
        let config = UiConfig::from_json(SAMPLE).unwrap();
        let map = config.element("map_button").unwrap();
        assert_eq!(map.search_area, Some(SearchArea { x1: 0, y1: 600, x2: 200, y2: 720 }));
        assert_eq!(map.threshold, Some(0.6));

        let castle = config.element("Castle").unwrap();
        assert_eq!(castle.search_area, None);
        assert_eq!(castle.threshold, None);
        assert!(config.ruin_markers.is_empty());
    }

    #[test]
    fn test_unknown_sections_survive_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = UiConfig::from_json(SAMPLE).unwrap();
        config.upsert(
            "exploreNew",
            UiElement {
                image_path: "resource/exploreNew.png".into(),
                search_area: Some([10, 20, 30, 40].into()),
                threshold: None,
            },
        );
        config.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["game_package"], "com.example.game");
        assert_eq!(raw["bot_settings"]["loop_delay"], 30);
        assert_eq!(
            raw["ui_elements"]["exploreNew"]["search_area"],
            serde_json::json!([10, 20, 30, 40])
        );

        let reloaded = UiConfig::load(&path).unwrap();
        assert_eq!(reloaded.ui_elements.len(), 3);
    }

    #[test]
    fn test_missing_file_falls_back_to_empty() {
        let config = UiConfig::load_or_default(Path::new("/nonexistent/ruinbot/config.json"));
        assert!(config.ui_elements.is_empty());
    }

    #[test]
    fn test_clamp_area() {
        let area = SearchArea { x1: 100, y1: 50, x2: 2000, y2: 900 };
        assert_eq!(
            area.clamp_to(1280, 720),
            Some(SearchArea { x1: 100, y1: 50, x2: 1280, y2: 720 })
        );

        let outside = SearchArea { x1: 1300, y1: 0, x2: 1400, y2: 100 };
        assert_eq!(outside.clamp_to(1280, 720), None);
    }
}
