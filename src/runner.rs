use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use thiserror::Error;

use crate::city::{CityManager, CityPaths};
use crate::config::Config;
use crate::detector::TemplateStore;
use crate::device::{self, AdbDevice, Device};
use crate::screen::{Pacing, Screen};
use crate::state::{AppState, BotPhase, StopFlag};
use crate::ui_config::UiConfig;

/// One-shot flows the worker can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Research,
    DragonPanel,
    Shipment,
    Buildings,
    Troops,
    March,
    ResetCity,
    ExploreRuins,
    Periodic,
    CountMarches,
    CityStatus,
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown task: {0}")]
pub struct UnknownTask(pub String);

const TASKS: [(&str, Task); 11] = [
    ("research", Task::Research),
    ("dragon_panel", Task::DragonPanel),
    ("shipment", Task::Shipment),
    ("buildings", Task::Buildings),
    ("troops", Task::Troops),
    ("march", Task::March),
    ("reset_city", Task::ResetCity),
    ("explore_ruins", Task::ExploreRuins),
    ("periodic", Task::Periodic),
    ("count_marches", Task::CountMarches),
    ("city_status", Task::CityStatus),
];

impl FromStr for Task {
    type Err = UnknownTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TASKS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, task)| *task)
            .ok_or_else(|| UnknownTask(s.to_string()))
    }
}

impl Task {
    pub fn name(self) -> &'static str {
        TASKS
            .iter()
            .find(|(_, task)| *task == self)
            .map_or("unknown", |(name, _)| *name)
    }

    /// Run the flow to completion on the calling thread.
    pub fn run(self, city: &CityManager) -> (bool, Value) {
        let simple = |ok: bool| (ok, Value::Null);
        match self {
            Task::Research => simple(city.go_to_research_area()),
            Task::DragonPanel => simple(city.go_to_dragon_panel()),
            Task::Shipment => simple(city.go_to_shipment_collect()),
            Task::Buildings => simple(city.click_buildings_panel()),
            Task::Troops => simple(city.click_troops_panel()),
            Task::March => simple(city.click_march_panel()),
            Task::ResetCity => simple(city.reset_to_city()),
            Task::ExploreRuins => match city.explore_ruins_flow() {
                Some(report) => (report.marches_used > 0, json!(report)),
                None => (false, json!({"budget": 0})),
            },
            Task::Periodic => {
                let outcomes = city.run_periodic_tasks();
                let detail: serde_json::Map<String, Value> = outcomes
                    .iter()
                    .map(|(name, ok)| (name.to_string(), Value::Bool(*ok)))
                    .collect();
                (outcomes.iter().all(|(_, ok)| *ok), Value::Object(detail))
            }
            Task::CountMarches => (true, json!({"available": city.count_available_marches()})),
            Task::CityStatus => (true, json!({"in_city": city.is_in_city()})),
        }
    }
}

fn city_paths(config: &Config) -> CityPaths {
    CityPaths {
        explored_file: config.explored_file.clone(),
        exploration_log: Some(config.exploration_log.clone()),
    }
}

/// Connect through adb and make the device current. Elements and templates
/// carry over from an earlier connection; the first one loads them from disk.
pub async fn connect(state: &AppState) -> Result<String> {
    let config = {
        let s = state.lock().await;
        if s.is_busy() {
            bail!("cannot reconnect while a task is running");
        }
        s.config.clone()
    };

    let device = tokio::task::spawn_blocking(move || AdbDevice::connect(&config))
        .await
        .context("connect task failed")??;

    attach(state, Arc::new(device)).await
}

/// Make `device` current, keeping loaded elements if a screen already exists.
pub async fn attach(state: &AppState, device: Arc<dyn Device>) -> Result<String> {
    let (config, previous) = {
        let s = state.lock().await;
        (s.config.clone(), s.screen.clone())
    };

    let screen = tokio::task::spawn_blocking(move || match previous {
        Some(prev) => prev.rebind(device),
        None => {
            let elements = UiConfig::load_or_default(&config.ui_config);
            let templates = TemplateStore::load(&elements);
            Screen::new(device, elements, templates, Pacing::new(config.delay_scale))
        }
    })
    .await
    .context("template loading failed")?;

    let serial = screen.device().serial().to_string();
    let mut s = state.lock().await;
    s.screen = Some(Arc::new(screen));
    if s.phase == BotPhase::Disconnected {
        s.phase = BotPhase::Idle;
    }
    tracing::info!("device {serial} attached");
    Ok(serial)
}

/// The basic loop: keep the game up and explore ruins every `interval`,
/// until `stop` is raised. Returns the number of loops started.
pub fn run_basic_loop(
    city: &CityManager,
    config: &Config,
    stop: &StopFlag,
    mut on_loop: impl FnMut(u64),
) -> u64 {
    let device = city.screen().device();
    let pacing = city.screen().pacing();
    let mut loops = 0;

    while !stop.is_raised() {
        loops += 1;
        on_loop(loops);
        tracing::info!("loop {loops}: checking game status");

        if !device::is_game_running(device, &config.game_package) {
            tracing::info!("game not running, attempting to launch");
            let (ok, message) =
                device::launch_game(device, &config.game_package, &config.game_activity, pacing);
            if ok {
                tracing::info!("{message}");
            } else {
                tracing::warn!("{message}");
            }
        }

        city.explore_ruins_flow();

        for _ in 0..config.loop_interval.as_secs() {
            if stop.is_raised() {
                break;
            }
            pacing.wait(Duration::from_secs(1));
        }
    }

    tracing::info!("bot loop stopped after {loops} loop(s)");
    loops
}

/// Spawn `work` as the single worker. `work` runs on the blocking pool and
/// its outcome is recorded when it returns.
async fn spawn_worker<F>(state: &AppState, name: &str, work: F) -> Result<(), BotPhase>
where
    F: FnOnce(CityManager) -> (bool, Value) + Send + 'static,
{
    let mut s = state.lock().await;
    let screen = s.begin_task(name)?;
    let city = CityManager::new(screen, city_paths(&s.config), s.stop.clone());
    tracing::info!("starting task {name}");

    let app = state.clone();
    let handle = tokio::spawn(async move {
        let (success, detail) = match tokio::task::spawn_blocking(move || work(city)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("worker failed: {e}");
                (false, json!({"error": e.to_string()}))
            }
        };
        app.lock().await.finish_task(success, detail);
    });
    s.worker = Some(handle);
    Ok(())
}

pub async fn start_task(state: &AppState, task: Task) -> Result<(), BotPhase> {
    spawn_worker(state, task.name(), move |city| task.run(&city)).await
}

pub async fn start_loop(state: &AppState) -> Result<(), BotPhase> {
    let (config, stop) = {
        let s = state.lock().await;
        (s.config.clone(), s.stop.clone())
    };
    let app = state.clone();
    spawn_worker(state, "loop", move |city| {
        let loops = run_basic_loop(&city, &config, &stop, |n| {
            app.blocking_lock().loop_count = n;
        });
        (true, json!({"loops": loops}))
    })
    .await
}
