//! Project configuration.
//!
//! Settings come from an optional `carinata.yaml` and are then overridden by command-line
//! flags. Every key is optional:
//!
//! ```yaml
//! extension: carinata              # spec file extension to look for
//! output_dir: build/specs          # default: <temp dir>/carinata
//! base_class: django.test.TestCase # default: unittest.TestCase
//! interpreter: python3             # used by `carinata run`
//! line_markers: true               # append `# L:<n>` to generated code lines
//! colors: false                    # default: on when stdout is a terminal
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codegen::GeneratorOptions;
use crate::errors::CarinataError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub extension: String,
    pub output_dir: Option<PathBuf>,
    pub base_class: String,
    pub interpreter: String,
    pub line_markers: bool,
    pub colors: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension: "carinata".to_string(),
            output_dir: None,
            base_class: GeneratorOptions::default().base_class,
            interpreter: "python3".to_string(),
            line_markers: false,
            colors: None,
        }
    }
}

impl Config {
    pub const FILE_NAME: &'static str = "carinata.yaml";

    /// Loads `explicit` if given, else `./carinata.yaml` if it exists, else the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, CarinataError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = Path::new(Self::FILE_NAME);
        if local.is_file() {
            return Self::load(local);
        }
        Ok(Self::default())
    }

    pub fn load(path: &Path) -> Result<Self, CarinataError> {
        let text = fs::read_to_string(path).map_err(|e| CarinataError::config(path, e))?;
        let config = Self::from_yaml(&text, path)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses YAML text; `origin` names it in errors.
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self, CarinataError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| CarinataError::config(origin, e))
    }

    /// Directory generated files are written under.
    pub fn output_root(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("carinata"))
    }

    pub fn use_colors(&self) -> bool {
        self.colors.unwrap_or_else(|| atty::is(atty::Stream::Stdout))
    }

    /// Generator options for these settings; the header is filled in per file.
    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            base_class: self.base_class.clone(),
            line_markers: self.line_markers,
            header: None,
        }
    }
}
