use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

use crate::detector::PreparedTemplate;
use crate::screen::Screen;
use crate::ui_config::{SearchArea, UiElement};

/// Padding around a captured element when its search area is chosen automatically.
const AUTO_PADDING: u32 = 50;
/// Captures must be strictly larger than this in both dimensions.
const MIN_CAPTURE_SIZE: u32 = 10;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid element name: {0:?}")]
    InvalidName(String),

    #[error("capture area too small: {width}x{height}")]
    TooSmall { width: u32, height: u32 },

    #[error("custom mode needs a search_area")]
    MissingSearchArea,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaMode {
    #[default]
    Automatic,
    FullScreen,
    Custom,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureRequest {
    /// Element bounds on the current screen.
    pub rect: SearchArea,
    #[serde(default)]
    pub mode: AreaMode,
    pub search_area: Option<SearchArea>,
    pub threshold: Option<f32>,
}

pub fn automatic_search_area(rect: SearchArea, width: u32, height: u32) -> SearchArea {
    SearchArea {
        x1: rect.x1.saturating_sub(AUTO_PADDING),
        y1: rect.y1.saturating_sub(AUTO_PADDING),
        x2: rect.x2.saturating_add(AUTO_PADDING).min(width),
        y2: rect.y2.saturating_add(AUTO_PADDING).min(height),
    }
}

fn search_area_for(request: &CaptureRequest, rect: SearchArea, width: u32, height: u32) -> Result<SearchArea, CaptureError> {
    match request.mode {
        AreaMode::Automatic => Ok(automatic_search_area(rect, width, height)),
        AreaMode::FullScreen => Ok(SearchArea { x1: 0, y1: 0, x2: width, y2: height }),
        AreaMode::Custom => request.search_area.ok_or(CaptureError::MissingSearchArea),
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Crop `request.rect` from the live screen, store it as `<resource_dir>/<name>.png`,
/// register it with `screen` and write the updated element config to `config_path`.
pub fn capture_element(
    screen: &Screen,
    name: &str,
    request: &CaptureRequest,
    config_path: &Path,
    resource_dir: &Path,
) -> Result<UiElement, CaptureError> {
    if !valid_name(name) {
        return Err(CaptureError::InvalidName(name.to_string()));
    }

    let shot = screen.device().screencap()?;
    let (width, height) = (shot.width(), shot.height());

    let clamped = request.rect.clamp_to(width, height);
    let rect = clamped
        .filter(|r| r.width() > MIN_CAPTURE_SIZE && r.height() > MIN_CAPTURE_SIZE)
        .ok_or(CaptureError::TooSmall {
            width: clamped.map_or(0, |r| r.width()),
            height: clamped.map_or(0, |r| r.height()),
        })?;

    let search_area = search_area_for(request, rect, width, height)?;

    let crop = shot.crop_imm(rect.x1, rect.y1, rect.width(), rect.height());
    std::fs::create_dir_all(resource_dir)
        .with_context(|| format!("failed to create {}", resource_dir.display()))?;
    let image_path: PathBuf = resource_dir.join(format!("{name}.png"));
    crop.save(&image_path)
        .with_context(|| format!("failed to save {}", image_path.display()))?;

    let element = UiElement {
        image_path,
        search_area: Some(search_area),
        threshold: request.threshold,
    };
    screen.add_element(name, element.clone(), PreparedTemplate::from_image(&crop));
    screen.ui_config().save(config_path)?;

    tracing::info!(
        "captured {name} {}x{} with search area {:?}",
        rect.width(),
        rect.height(),
        <[u32; 4]>::from(search_area)
    );
    Ok(element)
}
