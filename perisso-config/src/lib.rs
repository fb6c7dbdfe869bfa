use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "PERISSO_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `PERISSO_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let cwd = env::current_dir().map_err(|source| ConfigError::Context {
            message: "获取当前工作目录失败".to_string(),
            source,
        })?;
        Self::discover_in(&cwd)
    }

    /// 在给定目录下寻找 `config/default.toml`。
    pub fn discover_in(root: &Path) -> Result<Self, ConfigError> {
        let default_path = root.join("config").join("default.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 高亮默认值，颜色为 `[r, g, b, a]`。
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightConfig {
    #[serde(default = "HighlightConfig::default_color")]
    pub color: [u8; 4],
    #[serde(default = "HighlightConfig::default_muted_color")]
    pub muted_color: [u8; 4],
    #[serde(default = "HighlightConfig::default_wireframe")]
    pub wireframe: bool,
}

impl HighlightConfig {
    fn default_color() -> [u8; 4] {
        [77, 235, 103, 100]
    }

    fn default_muted_color() -> [u8; 4] {
        [164, 166, 165, 128]
    }

    fn default_wireframe() -> bool {
        true
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            color: Self::default_color(),
            muted_color: Self::default_muted_color(),
            wireframe: Self::default_wireframe(),
        }
    }
}

/// 离线模型来源。未设置快照时使用内置演示模型。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = AppConfig::discover_in(dir.path()).expect("discover should succeed");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.highlight.color, [77, 235, 103, 100]);
        assert_eq!(cfg.highlight.muted_color, [164, 166, 165, 128]);
        assert!(cfg.highlight.wireframe);
        assert!(cfg.model.snapshot.is_none());
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [highlight]
            color = [255, 0, 0, 255]
            wireframe = false

            [model]
            snapshot = "../models/office.json"
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.highlight.color, [255, 0, 0, 255]);
        assert_eq!(cfg.highlight.muted_color, [164, 166, 165, 128]);
        assert!(!cfg.highlight.wireframe);
        assert_eq!(
            cfg.model
                .snapshot
                .as_deref()
                .map(|p| p.to_string_lossy().to_string()),
            Some("../models/office.json".to_string())
        );
    }

    #[test]
    fn discover_reads_default_toml_under_root() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_dir = dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("create config dir");
        fs::write(config_dir.join("default.toml"), "[logging]\nlevel = \"trace\"\n")
            .expect("write config");

        let cfg = AppConfig::discover_in(dir.path()).expect("discover");
        assert_eq!(cfg.logging.level, "trace");
        assert!(cfg.highlight.wireframe);
    }

    #[test]
    fn invalid_color_reports_parse_error_with_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[highlight]\ncolor = [300, 0, 0, 0]").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = AppConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
