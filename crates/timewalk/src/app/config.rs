use std::fmt::Display;
use std::fs;
use std::path::Path;

use pathnet::{FollowerConfig, LoopConfig};
use serde::{Deserialize, Serialize};

pub(crate) const CONFIG_ENV_VAR: &str = "TIMEWALK_CONFIG";

pub(crate) type ConfigResult<T> = Result<T, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DemoConfig {
    pub(crate) follower: FollowerConfig,
    #[serde(rename = "loop")]
    pub(crate) loop_config: LoopConfig,
    pub(crate) frames: u32,
    pub(crate) frame_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            follower: FollowerConfig::default(),
            loop_config: LoopConfig::default(),
            frames: 240,
            frame_ms: 50,
        }
    }
}

pub(crate) fn load_demo_config(path: Option<&Path>) -> ConfigResult<DemoConfig> {
    let Some(path) = path else {
        return Ok(DemoConfig::default());
    };
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read config '{}': {error}", path.display()))?;
    let config = parse_demo_config_json(&raw)?;
    validate_demo_config(&config)?;
    Ok(config)
}

fn parse_demo_config_json(raw: &str) -> ConfigResult<DemoConfig> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, DemoConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse config json: {source}"))
            } else {
                Err(format!("parse config json at {path}: {source}"))
            }
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn validate_demo_config(config: &DemoConfig) -> ConfigResult<()> {
    if config.frame_ms == 0 {
        return Err(expected_actual("frame_ms", "positive integer", config.frame_ms));
    }
    let follower = &config.follower;
    if !(follower.speed.is_finite() && follower.speed > 0.0) {
        return Err(expected_actual(
            "follower.speed",
            "positive finite number",
            follower.speed,
        ));
    }
    if !(follower.intersection_size.is_finite() && follower.intersection_size >= 0.0) {
        return Err(expected_actual(
            "follower.intersection_size",
            "non-negative finite number",
            follower.intersection_size,
        ));
    }
    if !(0.0..=90.0).contains(&follower.max_path_error_degrees) {
        return Err(expected_actual(
            "follower.max_path_error_degrees",
            "angle between 0 and 90",
            follower.max_path_error_degrees,
        ));
    }
    if !(0.0..=1.0).contains(&follower.path_lerp_rate) {
        return Err(expected_actual(
            "follower.path_lerp_rate",
            "rate between 0 and 1",
            follower.path_lerp_rate,
        ));
    }
    Ok(())
}
