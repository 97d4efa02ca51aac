// config.rs — viewer settings: JSON file, then CLI / env overrides

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE: &str = "viewer.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("missing value for {0}")]
    MissingValue(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Asset name of the video, resolved inside `asset_dir`.
    pub video: String,
    pub asset_dir: PathBuf,
    /// Appended to `video` when it has no extension.
    pub asset_extension: String,
    pub looping: bool,
    pub sensor_hz: f64,
    /// Yaw speed of the simulated motion source.
    pub sweep_deg_per_sec: f64,
    pub render_options: Map<String, Value>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            video: "video360".to_string(),
            asset_dir: PathBuf::from("assets"),
            asset_extension: "gif".to_string(),
            looping: true,
            sensor_hz: 60.0,
            sweep_deg_per_sec: 12.0,
            render_options: Map::new(),
        }
    }
}

impl ViewerConfig {
    pub fn sensor_interval(&self) -> Duration {
        if self.sensor_hz > 0.0 {
            Duration::from_secs_f64(1.0 / self.sensor_hz)
        } else {
            crate::view::SENSOR_INTERVAL
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `--config`, or the first `viewer.json` found, then apply overrides.
    pub fn load<I: IntoIterator<Item = String>>(args: I) -> Result<Self, ConfigError> {
        let args: Vec<String> = args.into_iter().collect();
        let explicit = flag_value(&args, "--config")?.map(PathBuf::from);

        let mut config = match explicit.or_else(find_config_file) {
            Some(path) => {
                let config = Self::from_file(&path)?;
                info!("loaded config {}", path.display());
                config
            }
            None => {
                info!("no {} found, using defaults", CONFIG_FILE);
                Self::default()
            }
        };

        if let Ok(v) = std::env::var("VIDEO360_VIDEO") {
            if !v.trim().is_empty() {
                config.video = v;
            }
        }
        config.apply_args(&args)?;
        Ok(config)
    }

    /// CLI: `--video <name>`, `--assets <dir>`, `--no-loop`.
    pub fn apply_args(&mut self, args: &[String]) -> Result<(), ConfigError> {
        if let Some(v) = flag_value(args, "--video")? {
            self.video = v;
        }
        if let Some(v) = flag_value(args, "--assets")? {
            self.asset_dir = PathBuf::from(v);
        }
        if args.iter().any(|a| a == "--no-loop") {
            self.looping = false;
        }
        Ok(())
    }
}

fn flag_value(args: &[String], flag: &str) -> Result<Option<String>, ConfigError> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == flag {
            return match it.next() {
                Some(v) => Ok(Some(v.clone())),
                None => Err(ConfigError::MissingValue(flag.to_string())),
            };
        }
    }
    Ok(None)
}

fn find_config_file() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join(CONFIG_FILE);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join(CONFIG_FILE);
    if p.exists() {
        return Some(p);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(
            &path,
            r#"{ "video": "harbour", "render_options": { "vsync": false } }"#,
        )
        .unwrap();

        let config = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(config.video, "harbour");
        assert_eq!(config.asset_extension, "gif");
        assert_eq!(config.sensor_hz, 60.0);
        assert_eq!(config.render_options.get("vsync"), Some(&Value::Bool(false)));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ViewerConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_config_and_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{ "video": "from_file", "sensor_hz": 30.0 }"#).unwrap();
        let path_str = path.to_string_lossy().to_string();

        let config = ViewerConfig::load(args(&[
            "video360",
            "--config",
            path_str.as_str(),
            "--assets",
            "/srv/media",
            "--no-loop",
        ]))
        .unwrap();

        assert_eq!(config.asset_dir, PathBuf::from("/srv/media"));
        assert!(!config.looping);
        assert_eq!(config.sensor_interval(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn flag_without_value_is_rejected() {
        let mut config = ViewerConfig::default();
        assert!(matches!(
            config.apply_args(&args(&["video360", "--video"])),
            Err(ConfigError::MissingValue(_))
        ));
    }

    #[test]
    fn non_positive_rate_falls_back_to_sixty_hz() {
        let config = ViewerConfig {
            sensor_hz: 0.0,
            ..ViewerConfig::default()
        };
        assert_eq!(config.sensor_interval(), crate::view::SENSOR_INTERVAL);
    }

    #[test]
    fn default_video_is_bundled_and_decodes() {
        use crate::media::{AssetBundle, ImageMediaEngine, MediaEngine, MediaInfo};

        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let shipped = ViewerConfig::from_file(&root.join("assets").join(CONFIG_FILE)).unwrap();
        for config in [ViewerConfig::default(), shipped] {
            let bundle = AssetBundle::new(
                root.join(&config.asset_dir),
                config.asset_extension.clone(),
            );
            let path = bundle.resolve(&config.video).unwrap();
            assert_eq!(
                ImageMediaEngine.probe(&path).unwrap(),
                MediaInfo {
                    width: 256,
                    height: 128,
                    animated: true,
                }
            );
        }
    }
}
