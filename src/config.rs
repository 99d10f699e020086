use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::screen::MAX_DELAY_SCALE;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth_token: String,
    pub listen_addr: String,
    /// Path to the `adb` executable.
    pub adb_path: String,
    /// Preferred device serial; first attached device otherwise.
    pub device_serial: Option<String>,
    pub device_host: String,
    pub device_port: u16,
    pub game_package: String,
    pub game_activity: String,
    /// JSON file mapping UI element names to templates and search areas.
    pub ui_config: PathBuf,
    pub explored_file: PathBuf,
    /// JSON Lines journal, one record per exploration attempt.
    pub exploration_log: PathBuf,
    /// Where captured element templates are written.
    pub resource_dir: PathBuf,
    pub loop_interval: Duration,
    /// Multiplier applied to every UI delay (0 disables waiting).
    pub delay_scale: f32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_token = lookup("RUINBOT_AUTH_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("RUINBOT_AUTH_TOKEN".into()))?;

        let or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let device_port = parse_var(&lookup, "RUINBOT_DEVICE_PORT", 5555u16)?;
        let loop_secs = parse_var(&lookup, "RUINBOT_LOOP_INTERVAL_SECS", 30u64)?;
        let delay_scale = parse_var(&lookup, "RUINBOT_DELAY_SCALE", 1.0f32)?;
        if !(0.0..=MAX_DELAY_SCALE).contains(&delay_scale) {
            return Err(ConfigError::InvalidValue {
                name: "RUINBOT_DELAY_SCALE".into(),
                value: delay_scale.to_string(),
            });
        }

        Ok(Config {
            auth_token,
            listen_addr: or("RUINBOT_LISTEN_ADDR", "127.0.0.1:8090"),
            adb_path: or("RUINBOT_ADB_PATH", "adb"),
            device_serial: lookup("RUINBOT_DEVICE_SERIAL").filter(|s| !s.is_empty()),
            device_host: or("RUINBOT_DEVICE_HOST", "127.0.0.1"),
            device_port,
            game_package: or("RUINBOT_GAME_PACKAGE", "com.ifun.google.kingdom"),
            game_activity: or(
                "RUINBOT_GAME_ACTIVITY",
                "u3dsdk.kvmba.com.u3dsdk.MainSDKActivity",
            ),
            ui_config: or("RUINBOT_UI_CONFIG", "minimal_config.json").into(),
            explored_file: or("RUINBOT_EXPLORED_FILE", "explored_ruins.json").into(),
            exploration_log: or("RUINBOT_EXPLORATION_LOG", "exploration_log.jsonl").into(),
            resource_dir: or("RUINBOT_RESOURCE_DIR", "resource").into(),
            loop_interval: Duration::from_secs(loop_secs),
            delay_scale,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.into(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_with_only_token() {
        let config = Config::from_lookup(lookup_from(&[("RUINBOT_AUTH_TOKEN", "secret")])).unwrap();
        assert_eq!(config.auth_token, "secret");
        assert_eq!(config.listen_addr, "127.0.0.1:8090");
        assert_eq!(config.device_port, 5555);
        assert_eq!(config.device_serial, None);
        assert_eq!(config.game_package, "com.ifun.google.kingdom");
        assert_eq!(config.explored_file, PathBuf::from("explored_ruins.json"));
        assert_eq!(config.loop_interval, Duration::from_secs(30));
        assert_eq!(config.delay_scale, 1.0);
    }

    #[test]
    fn test_missing_token() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingEnv("RUINBOT_AUTH_TOKEN".into()));
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup_from(&[
            ("RUINBOT_AUTH_TOKEN", "t"),
            ("RUINBOT_DEVICE_PORT", "abc"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "RUINBOT_DEVICE_PORT"));
    }

    #[test]
    fn test_negative_delay_scale_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("RUINBOT_AUTH_TOKEN", "t"),
            ("RUINBOT_DELAY_SCALE", "-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_huge_delay_scale_rejected() {
        for raw in ["1e30", "inf", "NaN", "100.5"] {
            let err = Config::from_lookup(lookup_from(&[
                ("RUINBOT_AUTH_TOKEN", "t"),
                ("RUINBOT_DELAY_SCALE", raw),
            ]))
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "RUINBOT_DELAY_SCALE"),
                "{raw}"
            );
        }

        let config = Config::from_lookup(lookup_from(&[
            ("RUINBOT_AUTH_TOKEN", "t"),
            ("RUINBOT_DELAY_SCALE", "100"),
        ]))
        .unwrap();
        assert_eq!(config.delay_scale, MAX_DELAY_SCALE);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("RUINBOT_AUTH_TOKEN", "t"),
            ("RUINBOT_DEVICE_SERIAL", "emulator-5554"),
            ("RUINBOT_LOOP_INTERVAL_SECS", "5"),
            ("RUINBOT_DELAY_SCALE", "0"),
        ]))
        .unwrap();
        assert_eq!(config.device_serial.as_deref(), Some("emulator-5554"));
        assert_eq!(config.loop_interval, Duration::from_secs(5));
        assert_eq!(config.delay_scale, 0.0);
    }
}
