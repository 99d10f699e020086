use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use image::DynamicImage;
use thiserror::Error;

use crate::config::Config;
use crate::screen::Pacing;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to run adb: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("adb {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("device {0} not found")]
    DeviceNotFound(String),

    #[error("no devices found; make sure the device or emulator is running with ADB enabled")]
    NoDevices,

    #[error("device not responding: {0}")]
    NotResponding(String),
}

/// Narrow interface the flows drive the phone through.
pub trait Device: Send + Sync {
    fn serial(&self) -> &str;

    fn shell(&self, cmd: &str) -> Result<String, DeviceError>;

    /// Current screen as PNG bytes.
    fn screencap_png(&self) -> Result<Vec<u8>, DeviceError>;

    fn screencap(&self) -> Result<DynamicImage> {
        let png = self.screencap_png()?;
        image::load_from_memory(&png).context("failed to decode screenshot")
    }

    fn tap(&self, x: u32, y: u32) -> Result<(), DeviceError> {
        self.shell(&format!("input tap {x} {y}")).map(drop)
    }

    fn key_event(&self, code: &str) -> Result<(), DeviceError> {
        self.shell(&format!("input keyevent {code}")).map(drop)
    }

    fn input_text(&self, text: &str) -> Result<(), DeviceError> {
        self.shell(&format!("input text {text}")).map(drop)
    }
}

/// Device reached through the `adb` executable.
pub struct AdbDevice {
    adb_path: String,
    serial: String,
}

impl AdbDevice {
    /// Pick a device the way a human would with `adb devices`. With nothing
    /// attached, `host:port` is connected over TCP, configured serial or not.
    /// Otherwise the configured serial must be among the attached devices, or
    /// the first one is used.
    pub fn connect(config: &Config) -> Result<Self, DeviceError> {
        let listing = run_adb(&config.adb_path, &["devices"])?;
        let attached = parse_devices(&listing);
        tracing::info!("adb reports {} attached device(s)", attached.len());

        let serial = match choose_target(&attached, config.device_serial.as_deref())? {
            Target::Attached(serial) => serial,
            Target::Remote => {
                let target = format!("{}:{}", config.device_host, config.device_port);
                tracing::info!("no attached devices, connecting to {target}");
                let out = run_adb(&config.adb_path, &["connect", &target])?;
                if !out.contains("connected") {
                    tracing::warn!("adb connect {target}: {}", out.trim());
                    return Err(DeviceError::NoDevices);
                }
                target
            }
        };

        let device = AdbDevice {
            adb_path: config.adb_path.clone(),
            serial,
        };

        let echo = device.shell("echo test")?;
        if !echo.contains("test") {
            return Err(DeviceError::NotResponding(echo.trim().to_string()));
        }

        tracing::info!("connected to device {}", device.serial);
        Ok(device)
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, DeviceError> {
        let mut full = vec!["-s", self.serial.as_str()];
        full.extend_from_slice(args);
        run_adb_bytes(&self.adb_path, &full)
    }
}

impl Device for AdbDevice {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn shell(&self, cmd: &str) -> Result<String, DeviceError> {
        tracing::debug!("adb shell {cmd}");
        let out = self.run(&["shell", cmd])?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn screencap_png(&self) -> Result<Vec<u8>, DeviceError> {
        self.run(&["exec-out", "screencap", "-p"])
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Target {
    Attached(String),
    Remote,
}

fn choose_target(attached: &[String], wanted: Option<&str>) -> Result<Target, DeviceError> {
    if attached.is_empty() {
        return Ok(Target::Remote);
    }
    match wanted {
        None => Ok(Target::Attached(attached[0].clone())),
        Some(wanted) => attached
            .iter()
            .find(|s| *s == wanted)
            .map(|s| Target::Attached(s.clone()))
            .ok_or_else(|| DeviceError::DeviceNotFound(wanted.to_string())),
    }
}

fn run_adb(adb_path: &str, args: &[&str]) -> Result<String, DeviceError> {
    let out = run_adb_bytes(adb_path, args)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn run_adb_bytes(adb_path: &str, args: &[&str]) -> Result<Vec<u8>, DeviceError> {
    let output = Command::new(adb_path).args(args).output()?;
    if !output.status.success() {
        return Err(DeviceError::CommandFailed {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Serials from `adb devices` output that are in the `device` state.
pub fn parse_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|l| !l.starts_with("List of devices"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            (parts.next()? == "device").then(|| serial.to_string())
        })
        .collect()
}

/// Whether `dumpsys window windows` output shows `package` in focus.
pub fn focus_shows_package(dumpsys: &str, package: &str) -> bool {
    dumpsys.contains("mCurrentFocus=Window{") && dumpsys.contains(package)
}

pub fn is_game_running(device: &dyn Device, package: &str) -> bool {
    match device.shell("dumpsys window windows") {
        Ok(out) => focus_shows_package(&out, package),
        Err(e) => {
            tracing::warn!("error checking game status: {e}");
            false
        }
    }
}

/// Start `package/activity` unless it is already in focus.
pub fn launch_game(
    device: &dyn Device,
    package: &str,
    activity: &str,
    pacing: &Pacing,
) -> (bool, String) {
    if is_game_running(device, package) {
        return (true, format!("game {package} is already running"));
    }

    tracing::info!("launching {package}");
    if let Err(e) = device.shell(&format!("am start -n {package}/{activity}")) {
        return (false, format!("launch error: {e}"));
    }

    pacing.wait(Duration::from_secs(5));

    if is_game_running(device, package) {
        (true, format!("successfully launched {package}"))
    } else {
        (false, format!("failed to launch {package}"))
    }
}
