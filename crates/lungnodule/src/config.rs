use crate::classify::{Algorithm, SearchConfig};
use crate::error::{NoduleError, Result};
use crate::extract::{BatchOptions, DecodeErrorPolicy, ExtractOptions, SizeScope};
use crate::index::ScanOptions;
use crate::text::SearchMethod;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use xdg::BaseDirectories;

pub const CONFIG_ENV: &str = "LUNGNODULE_CONFIG";
pub const CONFIG_FILE: &str = "lungnodule.toml";

/// Every configurable option. Unset fields fall back to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub algorithm: Option<Algorithm>,
    pub psm: Option<SearchMethod>,
    pub r6psm: Option<SearchMethod>,
    pub get_largest_nodule_size: Option<bool>,
    pub codec: Option<String>,
    pub use_base_sentence_splitter: Option<bool>,
    pub size_scope: Option<SizeScope>,
    pub on_decode_error: Option<DecodeErrorPolicy>,
    pub jobs: Option<usize>,
    pub recursive: Option<bool>,
    pub include: Option<Vec<String>>,
    pub rules: Option<PathBuf>,
    pub splitter_model: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Settings {
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| NoduleError::Config(format!("Failed to parse config TOML: {}", e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NoduleError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Fields set in `top` win over fields set in `self`.
    pub fn overlay(self, top: Settings) -> Settings {
        Settings {
            algorithm: top.algorithm.or(self.algorithm),
            psm: top.psm.or(self.psm),
            r6psm: top.r6psm.or(self.r6psm),
            get_largest_nodule_size: top.get_largest_nodule_size.or(self.get_largest_nodule_size),
            codec: top.codec.or(self.codec),
            use_base_sentence_splitter: top.use_base_sentence_splitter.or(self.use_base_sentence_splitter),
            size_scope: top.size_scope.or(self.size_scope),
            on_decode_error: top.on_decode_error.or(self.on_decode_error),
            jobs: top.jobs.or(self.jobs),
            recursive: top.recursive.or(self.recursive),
            include: top.include.or(self.include),
            rules: top.rules.or(self.rules),
            splitter_model: top.splitter_model.or(self.splitter_model),
            log_dir: top.log_dir.or(self.log_dir),
            log_level: top.log_level.or(self.log_level),
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        let psm = self.psm.unwrap_or_default();
        ExtractOptions {
            algorithm: self.algorithm.unwrap_or_default(),
            rules_path: self.rules.clone(),
            search: SearchConfig::new(psm, self.r6psm),
            extract_size: self.get_largest_nodule_size.unwrap_or(false),
            size_scope: self.size_scope.unwrap_or_default(),
            use_base_splitter: self.use_base_sentence_splitter.unwrap_or(false),
            splitter_model: self.splitter_model.clone(),
            encoding: self.codec.clone().unwrap_or_else(|| "utf-8".to_string()),
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            recursive: self.recursive.unwrap_or(false),
            include: self.include.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            jobs: self.jobs.unwrap_or(1),
            on_decode_error: self.on_decode_error.unwrap_or_default(),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("log"))
    }

    /// Explicit level, else `debug` for a log file and `info` for stderr.
    pub fn log_level(&self) -> Result<LevelFilter> {
        match &self.log_level {
            Some(level) => LevelFilter::from_str(level)
                .map_err(|_| NoduleError::Config(format!("Invalid log level: {}", level))),
            None if self.log_dir() == Path::new("-") => Ok(LevelFilter::Info),
            None => Ok(LevelFilter::Debug),
        }
    }
}

/// Where configuration was loaded from.
pub struct Config {
    pub config_path: Option<PathBuf>,
    pub settings: Settings,
}

impl Config {
    /// Load the config file found by [`Config::locate`], or defaults when there is none.
    pub fn new(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = Self::locate(config_override, std::env::var_os(CONFIG_ENV))?;
        let settings = match &config_path {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        Ok(Self {
            config_path,
            settings,
        })
    }

    /// `--config`, then `$LUNGNODULE_CONFIG`, then `$XDG_CONFIG_HOME/lungnodule/lungnodule.toml`.
    ///
    /// An explicitly named file must exist; the XDG file is optional.
    pub fn locate(cli: Option<PathBuf>, env: Option<OsString>) -> Result<Option<PathBuf>> {
        let explicit = cli.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from));
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(NoduleError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Some(path));
        }

        let xdg = BaseDirectories::with_prefix("lungnodule").map_err(|e| {
            NoduleError::Config(format!("Failed to initialize XDG directories: {}", e))
        })?;
        Ok(xdg.find_config_file(CONFIG_FILE))
    }
}
