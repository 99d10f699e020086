use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::screen::Screen;

/// Cooperative cancellation shared between the API and the worker.
/// Checked between UI steps; a device call in flight still completes.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotPhase {
    Disconnected,
    Idle,
    Running,
    Stopping,
}

/// How the last worker run ended.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub task: String,
    pub success: bool,
    pub detail: serde_json::Value,
    pub finished_at: DateTime<Utc>,
}

pub struct AppStateInner {
    pub phase: BotPhase,
    pub config: Config,
    pub screen: Option<Arc<Screen>>,
    pub worker: Option<JoinHandle<()>>,
    pub stop: StopFlag,
    pub current_task: Option<String>,
    pub loop_count: u64,
    pub last_outcome: Option<TaskOutcome>,
}

pub type AppState = Arc<Mutex<AppStateInner>>;

impl AppStateInner {
    pub fn new(config: Config) -> Self {
        Self {
            phase: BotPhase::Disconnected,
            config,
            screen: None,
            worker: None,
            stop: StopFlag::default(),
            current_task: None,
            loop_count: 0,
            last_outcome: None,
        }
    }

    /// A worker is running or winding down.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, BotPhase::Running | BotPhase::Stopping)
    }

    /// Claim the worker slot for `task`. Fails when not connected or busy.
    pub fn begin_task(&mut self, task: &str) -> Result<Arc<Screen>, BotPhase> {
        let screen = match (&self.screen, self.phase) {
            (Some(screen), BotPhase::Idle) => screen.clone(),
            _ => return Err(self.phase),
        };
        self.stop.clear();
        self.phase = BotPhase::Running;
        self.current_task = Some(task.to_string());
        Ok(screen)
    }

    /// Release the worker slot and record how the run went.
    pub fn finish_task(&mut self, success: bool, detail: serde_json::Value) {
        let task = self.current_task.take().unwrap_or_default();
        tracing::info!("task {task} finished, success: {success}");
        self.last_outcome = Some(TaskOutcome {
            task,
            success,
            detail,
            finished_at: Utc::now(),
        });
        self.worker = None;
        self.stop.clear();
        self.phase = if self.screen.is_some() {
            BotPhase::Idle
        } else {
            BotPhase::Disconnected
        };
    }

    /// Ask the running worker to wind down. Returns false when nothing runs.
    pub fn request_stop(&mut self) -> bool {
        if self.phase != BotPhase::Running {
            return false;
        }
        self.stop.raise();
        self.phase = BotPhase::Stopping;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use image::RgbImage;
    use serde_json::json;

    use super::*;
    use crate::detector::TemplateStore;
    use crate::device::tests::ScriptedDevice;
    use crate::screen::Pacing;
    use crate::ui_config::UiConfig;

    fn config() -> Config {
        let vars = HashMap::from([("RUINBOT_AUTH_TOKEN", "secret")]);
        Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap()
    }

    fn connected() -> AppStateInner {
        let mut state = AppStateInner::new(config());
        let device = Arc::new(ScriptedDevice::new(RgbImage::new(4, 4)));
        state.screen = Some(Arc::new(Screen::new(
            device,
            UiConfig::default(),
            TemplateStore::default(),
            Pacing::none(),
        )));
        state.phase = BotPhase::Idle;
        state
    }

    #[test]
    fn test_stop_flag_shared_between_clones() {
        let flag = StopFlag::default();
        let other = flag.clone();
        assert!(!other.is_raised());
        flag.raise();
        assert!(other.is_raised());
        other.clear();
        assert!(!flag.is_raised());
    }

    #[test]
    fn test_begin_requires_connection() {
        let mut state = AppStateInner::new(config());
        assert_eq!(state.begin_task("research").err(), Some(BotPhase::Disconnected));
    }

    #[test]
    fn test_single_worker() {
        let mut state = connected();
        assert!(state.begin_task("explore_ruins").is_ok());
        assert_eq!(state.phase, BotPhase::Running);
        assert_eq!(state.begin_task("research").err(), Some(BotPhase::Running));
        assert!(state.is_busy());
    }

    #[test]
    fn test_stop_then_finish() {
        let mut state = connected();
        assert!(!state.request_stop());

        state.begin_task("loop").unwrap();
        assert!(state.request_stop());
        assert_eq!(state.phase, BotPhase::Stopping);
        assert!(state.stop.is_raised());

        state.finish_task(true, json!({"loops": 3}));
        assert_eq!(state.phase, BotPhase::Idle);
        assert!(!state.stop.is_raised());
        assert!(state.current_task.is_none());
        let outcome = state.last_outcome.as_ref().unwrap();
        assert_eq!(outcome.task, "loop");
        assert_eq!(outcome.detail["loops"], 3);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        assert_eq!(serde_json::to_value(BotPhase::Disconnected).unwrap(), "disconnected");
    }
}
