//! Run configuration, optionally loaded from a YAML file.

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ParserError, Result};
use crate::scanner::ScanOptions;
use crate::vocabulary::{Tag, Vocabulary};

/// How embedded (anonymous) struct fields are represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddedFields {
    /// Members are promoted onto the parent object
    #[default]
    Inline,
    /// The parent becomes an `allOf` of its own fields and the embedded
    /// definitions, flattened before output
    Compose,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default)]
    pub case_insensitive: bool,

    /// Extra keyword -> tag mappings, e.g. `Router: Path`
    #[serde(default)]
    pub aliases: BTreeMap<String, Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Any of `json`, `yaml`
    #[serde(default = "default_output_types")]
    pub types: Vec<String>,

    /// Output file stem
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            types: default_output_types(),
            file_name: default_file_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory names never descended into
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Read `_test.go` files
    #[serde(default = "default_true")]
    pub include_test_files: bool,

    #[serde(default)]
    pub embedded_fields: EmbeddedFields,

    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

fn default_exclude_dirs() -> Vec<String> {
    vec!["vendor".to_string(), "testdata".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_output_types() -> Vec<String> {
    vec!["json".to_string()]
}
fn default_file_name() -> String {
    "swagger".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_dirs: default_exclude_dirs(),
            include_test_files: true,
            embedded_fields: EmbeddedFields::default(),
            vocabulary: VocabularyConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ParserError::IOError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|err| ParserError::ConfigError {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        debug!("Loaded config from {:?}: {:?}", path, config);
        Ok(config)
    }

    /// The keyword table described by this config.
    pub fn vocabulary(&self) -> Vocabulary {
        let mut vocabulary = Vocabulary::standard();
        if self.vocabulary.case_insensitive {
            vocabulary = vocabulary.case_insensitive();
        }
        for (keyword, tag) in &self.vocabulary.aliases {
            vocabulary = vocabulary.with_alias(keyword, *tag);
        }
        vocabulary
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            exclude_dirs: self.exclude_dirs.clone(),
            include_test_files: self.include_test_files,
        }
    }
}
