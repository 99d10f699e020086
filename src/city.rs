use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::catalog::{Coord, RUINS, Site};
use crate::device::DeviceError;
use crate::exploration::{self, ExplorationReport};
use crate::explored::ExploredSet;
use crate::screen::Screen;
use crate::state::StopFlag;

/// Fixed taps on the world-map coordinate search bar.
const COORD_X_FIELD: (u32, u32) = (835, 41);
const COORD_Y_FIELD: (u32, u32) = (965, 41);
const SEARCH_BUTTON: (u32, u32) = (1061, 41);
/// Tile under the map cursor after a coordinate search.
const MAP_CENTER_TILE: (u32, u32) = (951, 313);

const DEFAULT_ATTEMPTS: u32 = 4;
const DEFAULT_THRESHOLD: f32 = 0.5;

/// Where flows write their persistent state.
#[derive(Debug, Clone)]
pub struct CityPaths {
    pub explored_file: PathBuf,
    pub exploration_log: Option<PathBuf>,
}

/// Scripted navigation around the player's city and the world map.
/// Every flow returns `false` on the first mandatory step that fails.
pub struct CityManager {
    screen: Arc<Screen>,
    paths: CityPaths,
    stop: StopFlag,
    last_reset: Mutex<Option<Instant>>,
}

impl CityManager {
    pub fn new(screen: Arc<Screen>, paths: CityPaths, stop: StopFlag) -> Self {
        CityManager {
            screen,
            paths,
            stop,
            last_reset: Mutex::new(None),
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn last_reset(&self) -> Option<Instant> {
        self.last_reset.lock().ok().and_then(|r| *r)
    }

    fn click(&self, name: &str) -> bool {
        self.screen.click_element(name, DEFAULT_ATTEMPTS, DEFAULT_THRESHOLD)
    }

    fn wait(&self, secs: f32) {
        self.screen.pacing().wait_secs(secs);
    }

    pub fn is_in_city(&self) -> bool {
        if self.screen.element("map_button").is_none() {
            tracing::warn!("map button config not found");
            return false;
        }
        self.screen.is_visible("map_button", 0.6)
    }

    /// Map button, then home button, then confirm the city view is back.
    pub fn reset_to_city(&self) -> bool {
        tracing::info!("resetting position to city center");

        if !self.click("map_button") {
            tracing::warn!("failed to click map button");
            return false;
        }
        self.wait(5.0);

        if !self.click("home_button") {
            tracing::warn!("failed to click home button");
            return false;
        }
        self.wait(6.0);

        if self.is_in_city() {
            tracing::info!("reset to city");
            if let Ok(mut last) = self.last_reset.lock() {
                *last = Some(Instant::now());
            }
            true
        } else {
            tracing::warn!("failed to verify city position after reset");
            false
        }
    }

    pub fn ensure_in_city(&self) -> bool {
        if self.is_in_city() {
            return true;
        }
        tracing::info!("not in city, attempting to reset position");
        self.reset_to_city()
    }

    pub fn go_to_research_area(&self) -> bool {
        tracing::info!("going to research area");
        if !self.ensure_in_city() {
            return false;
        }

        if !self.click("Castle") {
            self.reset_to_city();
            return false;
        }
        self.wait(1.0);
        if !self.click("Castle") {
            return false;
        }
        self.wait(2.0);

        if !self.click("ResearchArea") {
            return false;
        }
        tracing::info!("navigated to research area");
        true
    }

    pub fn go_to_dragon_panel(&self) -> bool {
        tracing::info!("going to dragon panel");
        if !self.ensure_in_city() || !self.reset_to_city() {
            return false;
        }

        if !self.click("Castle") {
            return false;
        }
        self.wait(1.0);

        if !self.click("DragonPanel") {
            return false;
        }
        tracing::info!("navigated to dragon panel");
        true
    }

    /// Gold pickup (optional), dwelling, warehouse, then claim the shipment if one is waiting.
    pub fn go_to_shipment_collect(&self) -> bool {
        tracing::info!("going to shipment collect");
        if !self.ensure_in_city() || !self.reset_to_city() {
            return false;
        }

        if self.click("GoldPickup") {
            tracing::info!("clicked gold pickup");
            self.wait(1.0);
        } else {
            tracing::info!("gold pickup not found, continuing");
        }

        if !self.click("DwelingArea") {
            tracing::warn!("failed to find dwelling area");
            return false;
        }
        self.wait(1.0);

        if !self.click("WareHouse") {
            tracing::warn!("failed to find warehouse");
            return false;
        }
        self.wait(1.0);

        if !self.click("ShipmentCollect") {
            tracing::info!("no shipment collect available");
            self.click("BackButton");
            return false;
        }
        tracing::info!("found and clicked shipment collect");
        self.wait(1.0);

        if self.click("ShipmentClaim") {
            self.wait(1.0);
            if self.click("ShipmentContinue") {
                self.wait(1.0);
            }
        }

        if self.click("BackButton") {
            self.wait(1.0);
        }
        tracing::info!("completed shipment collect routine");
        true
    }

    pub fn click_buildings_panel(&self) -> bool {
        self.ensure_in_city() && self.click("BuildingsPanel")
    }

    pub fn click_troops_panel(&self) -> bool {
        self.ensure_in_city() && self.click("TroopsPanel")
    }

    pub fn click_march_panel(&self) -> bool {
        self.ensure_in_city() && self.click("MarchPanel")
    }

    /// Shipment, research and dragon checks in turn. A failed task is logged
    /// and the next one still runs.
    pub fn run_periodic_tasks(&self) -> Vec<(&'static str, bool)> {
        tracing::info!("starting periodic city tasks");

        let tasks: [(&'static str, fn(&Self) -> bool); 3] = [
            ("shipment collection", Self::go_to_shipment_collect),
            ("research area check", Self::go_to_research_area),
            ("dragon panel check", Self::go_to_dragon_panel),
        ];

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (name, task) in tasks {
            if self.stop.is_raised() {
                tracing::info!("periodic tasks stopped before {name}");
                break;
            }
            tracing::info!("executing: {name}");
            let ok = task(self);
            if ok {
                tracing::info!("{name} completed");
            } else {
                tracing::warn!("{name} failed");
            }
            outcomes.push((name, ok));
            self.wait(2.0);
        }

        tracing::info!("periodic tasks completed");
        outcomes
    }

    /// Free march slots, 0 to 2.
    pub fn count_available_marches(&self) -> u8 {
        let mut slots = [None, None];
        for (slot, (name, threshold)) in slots.iter_mut().zip([("MarchNb1", 0.5), ("MarchNb2", 0.6)]) {
            if self.screen.element(name).is_none() {
                continue;
            }
            let visible = self.screen.is_visible(name, threshold);
            tracing::info!("{name} indicator {}", if visible { "present" } else { "absent" });
            *slot = Some(visible);
        }

        let budget = exploration::march_budget(slots);
        tracing::info!("total available marches: {budget}");
        budget
    }

    /// Tap a coordinate field on the map search bar and replace its value.
    pub fn input_coordinate(&self, field: (u32, u32), label: &str, value: u32) -> bool {
        match self.type_into_field(field, value) {
            Ok(()) => {
                tracing::debug!("entered {label}: {value}");
                true
            }
            Err(e) => {
                tracing::warn!("error inputting {label} coordinate: {e}");
                false
            }
        }
    }

    fn type_into_field(&self, field: (u32, u32), value: u32) -> Result<(), DeviceError> {
        let device = self.screen.device();
        device.tap(field.0, field.1)?;
        self.wait(0.5);
        // Field holds at most four digits.
        for _ in 0..4 {
            device.key_event("KEYCODE_DEL")?;
            self.wait(0.05);
        }
        device.input_text(&value.to_string())?;
        self.wait(0.25);
        device.key_event("KEYCODE_ENTER")?;
        self.wait(0.25);
        Ok(())
    }

    /// Jump the map to `coord`, open the tile there and send an explore march.
    pub fn search_ruin_at_coordinate(&self, coord: Coord) -> bool {
        tracing::info!("searching for ruin at {coord}");

        if !self.input_coordinate(COORD_X_FIELD, "X", coord.x)
            || !self.input_coordinate(COORD_Y_FIELD, "Y", coord.y)
        {
            return false;
        }

        if !self.screen.tap(SEARCH_BUTTON.0, SEARCH_BUTTON.1) {
            return false;
        }
        self.wait(1.25);

        if !self.screen.tap(MAP_CENTER_TILE.0, MAP_CENTER_TILE.1) {
            return false;
        }
        self.wait(0.25);

        let markers = self.screen.ruin_markers();
        if !markers.is_empty() {
            match markers.iter().find(|m| self.screen.click_element(m, 2, 0.43)) {
                Some(marker) => {
                    tracing::info!("found ruin ({marker})");
                    self.wait(0.35);
                }
                None => {
                    tracing::info!("no ruin found at {coord}");
                    return false;
                }
            }
        }

        if self.screen.click_element("exploreNew", 1, 0.4) {
            tracing::info!("started exploration at {coord}");
            self.wait(0.5);
            true
        } else {
            tracing::info!("explore button not found at {coord}");
            false
        }
    }

    /// Count marches, then send one explore march per free slot to catalog
    /// coordinates not tried before, and return to the city.
    pub fn explore_ruins_flow(&self) -> Option<ExplorationReport> {
        tracing::info!("starting ruin exploration flow");

        let budget = self.count_available_marches();
        if budget == 0 {
            tracing::info!("no marches available");
            return None;
        }

        let mut explored = ExploredSet::load(&self.paths.explored_file);
        tracing::info!("previously explored ruins: {}", explored.len());

        let mut visit = |site: &Site| self.search_ruin_at_coordinate(site.coord);
        let report = exploration::explore(
            &RUINS,
            budget,
            &mut explored,
            &mut visit,
            &self.stop,
            self.paths.exploration_log.as_deref(),
            self.screen.pacing(),
        );

        tracing::info!(
            "ruin exploration completed: marches used {}/{}, coordinates tried {}",
            report.marches_used,
            report.budget,
            report.attempted.len()
        );

        self.wait(2.0);
        if self.click("home_button") {
            tracing::info!("returned to city");
        }

        Some(report)
    }
}
