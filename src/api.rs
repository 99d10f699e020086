use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::capture::{self, CaptureError, CaptureRequest};
use crate::device;
use crate::runner::{self, Task};
use crate::screen::Screen;
use crate::state::{AppState, BotPhase, TaskOutcome};
use crate::ui_config::UiElement;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/connect", post(connect_device))
        .route("/launch", post(launch_game))
        .route("/game", get(game_status))
        .route("/status", get(get_status))
        .route("/start", post(start_loop))
        .route("/stop", post(stop_worker))
        .route("/tasks/{task}", post(run_task))
        .route("/screenshot", get(get_screenshot))
        .route("/detect", get(detect_element))
        .route("/click", post(click_element))
        .route("/elements", get(list_elements))
        .route("/elements/{name}", post(capture_element))
        .with_state(state)
}

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), StatusCode> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if let Some(token) = auth.strip_prefix("Bearer ")
        && token == expected_token
    {
        return Ok(());
    }

    Err(StatusCode::UNAUTHORIZED)
}

/// Authenticate and return the connected screen.
async fn connected_screen(state: &AppState, headers: &HeaderMap) -> Result<Arc<Screen>, StatusCode> {
    let s = state.lock().await;
    check_auth(headers, &s.config.auth_token)?;
    s.screen.clone().ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

/// Device I/O from a handler. Refused while the worker drives the device.
async fn on_device<T, F>(state: &AppState, headers: &HeaderMap, f: F) -> Result<T, StatusCode>
where
    T: Send + 'static,
    F: FnOnce(&Screen) -> T + Send + 'static,
{
    let screen = {
        let s = state.lock().await;
        check_auth(headers, &s.config.auth_token)?;
        if s.is_busy() {
            return Err(StatusCode::CONFLICT);
        }
        s.screen.clone().ok_or(StatusCode::SERVICE_UNAVAILABLE)?
    };

    tokio::task::spawn_blocking(move || f(&screen))
        .await
        .map_err(|e| {
            tracing::error!("device call failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn connect_device(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    {
        let s = state.lock().await;
        check_auth(&headers, &s.config.auth_token)?;
        if s.is_busy() {
            return Err(StatusCode::CONFLICT);
        }
    }

    match runner::connect(&state).await {
        Ok(serial) => Ok(Json(json!({"status": "connected", "serial": serial}))),
        Err(e) => {
            tracing::error!("connect failed: {e:#}");
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

async fn launch_game(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let (package, activity) = {
        let s = state.lock().await;
        (s.config.game_package.clone(), s.config.game_activity.clone())
    };

    let (launched, message) = on_device(&state, &headers, move |screen| {
        device::launch_game(screen.device(), &package, &activity, screen.pacing())
    })
    .await?;

    Ok(Json(json!({"launched": launched, "message": message})))
}

async fn game_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let package = state.lock().await.config.game_package.clone();
    let pkg = package.clone();
    let running = on_device(&state, &headers, move |screen| {
        device::is_game_running(screen.device(), &pkg)
    })
    .await?;

    Ok(Json(json!({"package": package, "running": running})))
}

#[derive(Serialize)]
struct StatusResponse {
    phase: BotPhase,
    device: Option<String>,
    current_task: Option<String>,
    loop_count: u64,
    last_outcome: Option<TaskOutcome>,
}

async fn get_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let s = state.lock().await;
    check_auth(&headers, &s.config.auth_token)?;

    Ok(Json(StatusResponse {
        phase: s.phase,
        device: s.screen.as_ref().map(|sc| sc.device().serial().to_string()),
        current_task: s.current_task.clone(),
        loop_count: s.loop_count,
        last_outcome: s.last_outcome.clone(),
    }))
}

fn refused(phase: BotPhase) -> StatusCode {
    match phase {
        BotPhase::Disconnected => StatusCode::SERVICE_UNAVAILABLE,
        BotPhase::Idle | BotPhase::Running | BotPhase::Stopping => StatusCode::CONFLICT,
    }
}

async fn start_loop(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    {
        let s = state.lock().await;
        check_auth(&headers, &s.config.auth_token)?;
    }

    runner::start_loop(&state).await.map_err(refused)?;
    Ok(Json(json!({"status": "started"})))
}

async fn stop_worker(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let mut s = state.lock().await;
    check_auth(&headers, &s.config.auth_token)?;

    if s.request_stop() {
        tracing::info!("stopping bot");
        Ok(Json(json!({"status": "stopping"})))
    } else {
        Ok(Json(json!({"status": s.phase})))
    }
}

async fn run_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(task): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    {
        let s = state.lock().await;
        check_auth(&headers, &s.config.auth_token)?;
    }

    let task: Task = task.parse().map_err(|_| StatusCode::NOT_FOUND)?;
    runner::start_task(&state, task).await.map_err(refused)?;
    Ok(Json(json!({"status": "started", "task": task.name()})))
}

async fn get_screenshot(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    // Reading the screen does not interfere with a running flow.
    let screen = connected_screen(&state, &headers).await?;

    let png_bytes = tokio::task::spawn_blocking(move || screen.device().screencap_png())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(|e| {
            tracing::error!("screenshot failed: {e}");
            StatusCode::BAD_GATEWAY
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_owned()),
            (header::CONTENT_DISPOSITION, "inline; filename=\"screenshot.png\"".to_owned()),
        ],
        png_bytes,
    ))
}

#[derive(Deserialize)]
struct ElementParams {
    element: String,
    threshold: Option<f32>,
}

#[derive(Serialize)]
struct DetectResponse {
    found: bool,
    threshold: f32,
    x: Option<u32>,
    y: Option<u32>,
    score: Option<f32>,
}

/// Manual detection uses the same default as flows.
const DEFAULT_THRESHOLD: f32 = 0.5;

async fn detect_element(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ElementParams>,
) -> Result<impl IntoResponse, StatusCode> {
    let screen = connected_screen(&state, &headers).await?;
    if screen.element(&params.element).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let threshold = params.threshold.unwrap_or(DEFAULT_THRESHOLD);
    let detection = tokio::task::spawn_blocking(move || screen.detect(&params.element, threshold))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(|e| {
            tracing::error!("detect failed: {e:#}");
            StatusCode::BAD_GATEWAY
        })?;

    let resp = match detection.best {
        Some(m) => DetectResponse {
            found: detection.hit().is_some(),
            threshold: detection.threshold,
            x: Some(m.x),
            y: Some(m.y),
            score: Some(m.score),
        },
        None => DetectResponse {
            found: false,
            threshold: detection.threshold,
            x: None,
            y: None,
            score: None,
        },
    };

    Ok(Json(resp))
}

async fn click_element(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ElementParams>,
) -> Result<impl IntoResponse, StatusCode> {
    let threshold = params.threshold.unwrap_or(DEFAULT_THRESHOLD);
    let name = params.element.clone();
    let clicked = on_device(&state, &headers, move |screen| {
        screen.click_element(&name, 4, threshold)
    })
    .await?;

    Ok(Json(json!({"element": params.element, "clicked": clicked})))
}

#[derive(Serialize)]
struct ElementEntry {
    name: String,
    #[serde(flatten)]
    element: UiElement,
}

async fn list_elements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let screen = connected_screen(&state, &headers).await?;
    let config = screen.ui_config();
    let elements: Vec<ElementEntry> = config
        .ui_elements
        .into_iter()
        .map(|(name, element)| ElementEntry { name, element })
        .collect();

    Ok(Json(json!({
        "elements": elements,
        "ruin_markers": config.ruin_markers,
    })))
}

async fn capture_element(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(request): Json<CaptureRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let (config_path, resource_dir) = {
        let s = state.lock().await;
        (s.config.ui_config.clone(), s.config.resource_dir.clone())
    };

    let result = on_device(&state, &headers, move |screen| {
        capture::capture_element(screen, &name, &request, &config_path, &resource_dir)
    })
    .await?;

    match result {
        Ok(element) => Ok(Json(element)),
        Err(e @ (CaptureError::InvalidName(_) | CaptureError::TooSmall { .. } | CaptureError::MissingSearchArea)) => {
            tracing::warn!("capture rejected: {e}");
            Err(StatusCode::BAD_REQUEST)
        }
        Err(CaptureError::Other(e)) => {
            tracing::error!("capture failed: {e:#}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
