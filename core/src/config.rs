//! Startup parameters and the environment derived from them.
//!
//! The host supplies three filesystem locations. Before the engine is built
//! the bridge derives a fixed set of environment-style values from them; the
//! engine factory receives the result, and by default it is also exported to
//! the process environment.
//!
//! Configuration files are TOML:
//!
//! ```toml
//! default_input_method = "pinyin"
//! input_methods = ["pinyin", "keyboard-us"]
//! program = "my-keyboard"
//!
//! [paths]
//! app_data = "/data/app"
//! app_lib = "/data/app/lib"
//! ext_data = "/sdcard/app"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_SKIP_BUILTIN_PATH: &str = "IME_SKIP_BUILTIN_PATH";
pub const ENV_HOME: &str = "HOME";
pub const ENV_XDG_DATA_DIRS: &str = "XDG_DATA_DIRS";
pub const ENV_XDG_CONFIG_HOME: &str = "XDG_CONFIG_HOME";
pub const ENV_XDG_DATA_HOME: &str = "XDG_DATA_HOME";
pub const ENV_ADDON_DIRS: &str = "IME_ADDON_DIRS";
pub const ENV_MODEL_DIRS: &str = "IME_MODEL_DIRS";
pub const ENV_PKGDATADIR: &str = "IME_PKGDATADIR";

/// Models live under this directory of `app_data`.
pub const MODEL_SUBDIR: &str = "ime/models";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{0}")]
    Invalid(String),
}

/// The three locations the host hands to `start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupPaths {
    /// Read-only application data (bundled tables, models).
    pub app_data: PathBuf,
    /// Directory holding engine add-on libraries.
    pub app_lib: PathBuf,
    /// Writable external storage; becomes the engine's home.
    pub ext_data: PathBuf,
}

impl StartupPaths {
    pub fn new(
        app_data: impl Into<PathBuf>,
        app_lib: impl Into<PathBuf>,
        ext_data: impl Into<PathBuf>,
    ) -> Self {
        Self {
            app_data: app_data.into(),
            app_lib: app_lib.into(),
            ext_data: ext_data.into(),
        }
    }

    /// Directory the engine loads its language models from.
    pub fn model_dir(&self) -> PathBuf {
        self.app_data.join(MODEL_SUBDIR)
    }
}

/// Everything `start` needs besides the engine factory and the event sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Input methods placed in the active group, in order.
    pub input_methods: Vec<String>,

    /// Default input method; empty selects the first of `input_methods`.
    pub default_input_method: String,

    /// Program name the single input context is created for.
    pub program: String,

    /// Export the derived environment to the process before building the engine.
    pub apply_environment: bool,

    pub paths: StartupPaths,

    /// Extra variables, applied after (and overriding) the derived ones.
    pub extra_env: BTreeMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            input_methods: vec!["pinyin".to_string()],
            default_input_method: "pinyin".to_string(),
            program: "imebridge".to_string(),
            apply_environment: true,
            paths: StartupPaths::default(),
            extra_env: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    pub fn new(paths: StartupPaths) -> Self {
        Self {
            paths,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject configurations the engine could not be started with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let paths = [
            ("app_data", &self.paths.app_data),
            ("app_lib", &self.paths.app_lib),
            ("ext_data", &self.paths.ext_data),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("path '{}' is not set", name)));
            }
        }

        if self.input_methods.is_empty() {
            return Err(ConfigError::Invalid("no input methods configured".to_string()));
        }

        if !self.default_input_method.is_empty()
            && !self.input_methods.contains(&self.default_input_method)
        {
            return Err(ConfigError::Invalid(format!(
                "default input method '{}' is not in the input method list",
                self.default_input_method
            )));
        }

        if self.program.is_empty() {
            return Err(ConfigError::Invalid("program name is empty".to_string()));
        }

        Ok(())
    }

    /// The environment for this configuration, extras included.
    pub fn environment(&self) -> Environment {
        Environment::derive(&self.paths).with_overrides(&self.extra_env)
    }
}

/// Ordered environment-style key/value list handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(String, String)>,
}

impl Environment {
    /// The fixed variable set derived from the startup paths.
    pub fn derive(paths: &StartupPaths) -> Self {
        let app_data = paths.app_data.to_string_lossy().into_owned();
        let app_lib = paths.app_lib.to_string_lossy().into_owned();
        let ext_data = paths.ext_data.to_string_lossy().into_owned();
        let models = paths.model_dir().to_string_lossy().into_owned();

        let mut env = Self::default();
        env.set(ENV_SKIP_BUILTIN_PATH, "true");
        env.set(ENV_HOME, &ext_data);
        env.set(ENV_XDG_DATA_DIRS, &app_data);
        env.set(ENV_XDG_CONFIG_HOME, &ext_data);
        env.set(ENV_XDG_DATA_HOME, &ext_data);
        env.set(ENV_ADDON_DIRS, &app_lib);
        env.set(ENV_MODEL_DIRS, &models);
        env.set(ENV_PKGDATADIR, &models);
        env
    }

    /// Apply `overrides` on top of this environment.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        for (key, value) in overrides {
            self.set(key, value);
        }
        self
    }

    /// Set `key`, replacing any previous value in place.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.vars.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.vars.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// First entry of the model search path, if any.
    pub fn model_dir(&self) -> Option<PathBuf> {
        self.get(ENV_MODEL_DIRS)
            .and_then(|dirs| dirs.split(':').find(|d| !d.is_empty()))
            .map(PathBuf::from)
    }

    /// Export every variable to the process environment.
    pub fn apply(&self) {
        for (key, value) in self.iter() {
            tracing::debug!(key, value, "setting engine environment");
            std::env::set_var(key, value);
        }
    }
}
