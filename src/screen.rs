use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::detector::{self, PreparedTemplate, TemplateMatch, TemplateStore};
use crate::device::Device;
use crate::ui_config::{UiConfig, UiElement};

/// Largest accepted delay multiplier. Far beyond it `Duration::mul_f32` overflows.
pub const MAX_DELAY_SCALE: f32 = 100.0;

/// Scales every UI delay. Animations need real waits on a phone; tests run with none.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    scale: f32,
}

impl Pacing {
    /// `scale` is clamped to `0..=MAX_DELAY_SCALE`; a non-finite scale means real time.
    pub fn new(scale: f32) -> Self {
        let scale = if scale.is_finite() {
            scale.clamp(0.0, MAX_DELAY_SCALE)
        } else {
            1.0
        };
        Pacing { scale }
    }

    pub fn none() -> Self {
        Pacing { scale: 0.0 }
    }

    pub fn scaled(&self, delay: Duration) -> Duration {
        delay.mul_f32(self.scale)
    }

    pub fn wait(&self, delay: Duration) {
        let d = self.scaled(delay);
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }

    pub fn wait_secs(&self, secs: f32) {
        self.wait(Duration::from_secs_f32(secs));
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::new(1.0)
    }
}

/// Elements whose tap lands 45px right of the detected label, on the input box.
const COORD_FIELDS: [&str; 2] = ["coordX", "coordY"];
const COORD_FIELD_TAP_OFFSET: u32 = 45;

/// Result of looking for one element on the current screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub best: Option<TemplateMatch>,
    pub threshold: f32,
}

impl Detection {
    pub fn hit(&self) -> Option<(u32, u32)> {
        self.best
            .filter(|m| m.score >= self.threshold)
            .map(|m| (m.x, m.y))
    }
}

/// The device plus everything needed to find named UI elements on it.
pub struct Screen {
    device: Arc<dyn Device>,
    elements: RwLock<UiConfig>,
    templates: RwLock<TemplateStore>,
    pacing: Pacing,
}

impl Screen {
    pub fn new(device: Arc<dyn Device>, elements: UiConfig, templates: TemplateStore, pacing: Pacing) -> Self {
        Screen {
            device,
            elements: RwLock::new(elements),
            templates: RwLock::new(templates),
            pacing,
        }
    }

    /// Same elements and templates, driven through another device link.
    pub fn rebind(&self, device: Arc<dyn Device>) -> Screen {
        let templates = self
            .templates
            .read()
            .map(|t| t.clone())
            .unwrap_or_default();
        Screen::new(device, self.ui_config(), templates, self.pacing)
    }

    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    pub fn element(&self, name: &str) -> Option<UiElement> {
        self.elements.read().ok()?.element(name).cloned()
    }

    pub fn ruin_markers(&self) -> Vec<String> {
        self.elements
            .read()
            .map(|c| c.ruin_markers.clone())
            .unwrap_or_default()
    }

    /// Copy of the element configuration as currently loaded.
    pub fn ui_config(&self) -> UiConfig {
        self.elements.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn element_names(&self) -> Vec<String> {
        self.elements
            .read()
            .map(|c| c.ui_elements.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Register a freshly captured element so flows can use it right away.
    pub fn add_element(&self, name: &str, element: UiElement, template: PreparedTemplate) {
        if let Ok(mut elements) = self.elements.write() {
            elements.upsert(name, element);
        }
        if let Ok(mut templates) = self.templates.write() {
            templates.insert(name, template);
        }
    }

    fn template(&self, name: &str, element: &UiElement) -> Result<Arc<PreparedTemplate>> {
        if let Some(t) = self.templates.read().ok().and_then(|s| s.get(name)) {
            return Ok(t);
        }
        let prepared = PreparedTemplate::open(&element.image_path)?;
        let mut store = self
            .templates
            .write()
            .map_err(|_| anyhow!("template store poisoned"))?;
        store.insert(name, prepared);
        store
            .get(name)
            .ok_or_else(|| anyhow!("template {name} vanished after insert"))
    }

    /// Capture the screen and look for `name` inside its search area.
    pub fn detect(&self, name: &str, default_threshold: f32) -> Result<Detection> {
        let element = self
            .element(name)
            .ok_or_else(|| anyhow!("element '{name}' not found in config"))?;
        let template = self.template(name, &element)?;
        let screenshot = self.device.screencap()?;
        let best = detector::find_best_match(&screenshot, &template, element.search_area);
        Ok(Detection {
            best,
            threshold: element.threshold.unwrap_or(default_threshold),
        })
    }

    /// Presence check; errors count as absent.
    pub fn is_visible(&self, name: &str, default_threshold: f32) -> bool {
        match self.detect(name, default_threshold) {
            Ok(d) => d.hit().is_some(),
            Err(e) => {
                tracing::warn!("detect {name}: {e:#}");
                false
            }
        }
    }

    pub fn tap(&self, x: u32, y: u32) -> bool {
        match self.device.tap(x, y) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("tap ({x}, {y}) failed: {e}");
                false
            }
        }
    }

    /// Find `name` and tap it, retrying detection up to `max_attempts` times.
    pub fn click_element(&self, name: &str, max_attempts: u32, default_threshold: f32) -> bool {
        if self.element(name).is_none() {
            tracing::warn!("element '{name}' not found in config");
            return false;
        }

        for attempt in 1..=max_attempts {
            let hit = match self.detect(name, default_threshold) {
                Ok(d) => d.hit(),
                Err(e) => {
                    tracing::warn!("detect {name}: {e:#}");
                    None
                }
            };

            if let Some((x, y)) = hit {
                let tap_x = if COORD_FIELDS.contains(&name) {
                    tracing::debug!("shifting {name} tap x {x} -> {}", x + COORD_FIELD_TAP_OFFSET);
                    x + COORD_FIELD_TAP_OFFSET
                } else {
                    x
                };
                return if self.tap(tap_x, y) {
                    tracing::info!("clicked {name} at ({tap_x}, {y})");
                    true
                } else {
                    tracing::warn!("failed to click {name}");
                    false
                };
            }

            if attempt < max_attempts {
                tracing::info!("element '{name}' not found, attempt {attempt}/{max_attempts}");
            }
        }

        tracing::info!("element '{name}' not found after {max_attempts} attempts");
        false
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    use image::RgbImage;

    use super::*;
    use crate::detector::tests::{blank_screen, crop_with_margin, draw_badge, draw_bar};
    use crate::device::tests::ScriptedDevice;
    use crate::ui_config::SearchArea;

    /// Badge at (120, 50) and bar at (40, 90) on a 200x120 screen.
    pub fn screen_with(badge: bool, bar: bool) -> RgbImage {
        let mut img = blank_screen(200, 120);
        if badge {
            draw_badge(&mut img, 120, 50);
        }
        if bar {
            draw_bar(&mut img, 40, 90);
        }
        img
    }

    pub fn badge_template() -> PreparedTemplate {
        PreparedTemplate::from_image(&crop_with_margin(&screen_with(true, false), 120, 50, 10, 10))
    }

    pub fn bar_template() -> PreparedTemplate {
        PreparedTemplate::from_image(&crop_with_margin(&screen_with(false, true), 40, 90, 16, 4))
    }

    pub fn element(threshold: Option<f32>) -> UiElement {
        UiElement {
            image_path: Path::new("/nonexistent/template.png").into(),
            search_area: None,
            threshold,
        }
    }

    /// Screen over `device` with the given element names bound to badge or bar templates.
    pub fn screen_for(device: Arc<ScriptedDevice>, badges: &[&str], bars: &[&str]) -> Screen {
        let screen = Screen::new(device, UiConfig::default(), TemplateStore::default(), Pacing::none());
        for name in badges {
            screen.add_element(name, element(Some(0.95)), badge_template());
        }
        for name in bars {
            screen.add_element(name, element(Some(0.95)), bar_template());
        }
        screen
    }

    #[test]
    fn test_detect_hit_and_miss() {
        let device = Arc::new(ScriptedDevice::new(screen_with(true, false)));
        let screen = screen_for(device, &["badge"], &["bar"]);
        assert_eq!(screen.detect("badge", 0.5).unwrap().hit(), Some((125, 55)));
        assert_eq!(screen.detect("bar", 0.5).unwrap().hit(), None);
    }

    #[test]
    fn test_detect_unknown_element_errors() {
        let device = Arc::new(ScriptedDevice::new(screen_with(true, false)));
        let screen = screen_for(device, &[], &[]);
        assert!(screen.detect("nothing", 0.5).is_err());
        assert!(!screen.is_visible("nothing", 0.5));
    }

    #[test]
    fn test_element_threshold_overrides_default() {
        let device = Arc::new(ScriptedDevice::new(screen_with(true, false)));
        let screen = screen_for(device, &[], &[]);
        screen.add_element("strict", element(Some(1.5)), badge_template());
        screen.add_element("loose", element(None), badge_template());
        assert_eq!(screen.detect("strict", 0.1).unwrap().hit(), None);
        assert_eq!(screen.detect("loose", 0.9).unwrap().hit(), Some((125, 55)));
    }

    #[test]
    fn test_search_area_limits_detection() {
        let device = Arc::new(ScriptedDevice::new(screen_with(true, false)));
        let screen = screen_for(device, &[], &[]);
        let mut left_half = element(Some(0.95));
        left_half.search_area = Some(SearchArea { x1: 0, y1: 0, x2: 100, y2: 120 });
        screen.add_element("badge_left", left_half, badge_template());
        assert_eq!(screen.detect("badge_left", 0.5).unwrap().hit(), None);
    }

    #[test]
    fn test_click_taps_center() {
        let device = Arc::new(ScriptedDevice::new(screen_with(true, false)));
        let screen = screen_for(device.clone(), &["Castle"], &[]);
        assert!(screen.click_element("Castle", 4, 0.5));
        assert_eq!(device.taps(), vec!["input tap 125 55"]);
    }

    #[test]
    fn test_click_shifts_coordinate_fields() {
        let device = Arc::new(ScriptedDevice::new(screen_with(true, false)));
        let screen = screen_for(device.clone(), &["coordX"], &[]);
        assert!(screen.click_element("coordX", 1, 0.5));
        assert_eq!(device.taps(), vec!["input tap 170 55"]);
    }

    #[test]
    fn test_click_retries_until_visible() {
        let device = Arc::new(ScriptedDevice::new(screen_with(true, false)));
        device.queue_screen(screen_with(false, false));
        device.queue_screen(screen_with(false, false));
        let screen = screen_for(device.clone(), &["Castle"], &[]);
        assert!(screen.click_element("Castle", 3, 0.5));
        assert_eq!(device.taps().len(), 1);
    }

    #[test]
    fn test_click_gives_up_after_attempts() {
        let device = Arc::new(ScriptedDevice::new(screen_with(false, false)));
        let screen = screen_for(device.clone(), &["Castle"], &[]);
        assert!(!screen.click_element("Castle", 2, 0.5));
        assert!(device.taps().is_empty());
    }

    #[test]
    fn test_click_unknown_element() {
        let device = Arc::new(ScriptedDevice::new(screen_with(true, false)));
        let screen = screen_for(device.clone(), &[], &[]);
        assert!(!screen.click_element("Missing", 4, 0.5));
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_pacing_scale() {
        assert_eq!(Pacing::none().scaled(Duration::from_secs(5)), Duration::ZERO);
        assert_eq!(Pacing::new(0.5).scaled(Duration::from_secs(4)), Duration::from_secs(2));
        assert_eq!(Pacing::new(-3.0).scaled(Duration::from_secs(4)), Duration::ZERO);
    }

    #[test]
    fn test_pacing_huge_scale_is_capped() {
        let long = Duration::from_secs(6);
        assert_eq!(Pacing::new(1e30).scaled(long), long.mul_f32(MAX_DELAY_SCALE));
        assert_eq!(Pacing::new(f32::NAN).scaled(long), long);
    }
}
