use anyhow::{Context, Result};
use log::{debug, info};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::models::Document;

/// Renders a finished Swagger 2.0 document to JSON and YAML files
pub struct Generator<'a> {
    document: &'a Document,
    file_name: String,
}

impl<'a> Generator<'a> {
    pub fn new(document: &'a Document, file_name: impl Into<String>) -> Self {
        Self {
            document,
            file_name: file_name.into(),
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self.document)
            .context("Failed to serialize Swagger document to JSON")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self.document).context("Failed to serialize Swagger document to YAML")
    }

    /// Writes each requested output type into `output_dir`, returning the
    /// written paths.
    pub fn generate(&self, output_dir: impl AsRef<Path>, output_types: &[String]) -> Result<Vec<PathBuf>> {
        let output_dir = output_dir.as_ref();

        // Serialize everything first so a failure leaves no partial output
        let mut rendered = Vec::new();
        for output_type in output_types {
            match output_type.trim() {
                "json" => rendered.push(("json", self.to_json()?)),
                "yaml" | "yml" => rendered.push(("yaml", self.to_yaml()?)),
                other => debug!("Unknown output type: {}", other),
            }
        }

        fs::create_dir_all(output_dir)
            .context(format!("Failed to create output directory: {:?}", output_dir))?;

        let mut written = Vec::new();
        for (extension, content) in rendered {
            written.push(self.write_file(output_dir, extension, &content)?);
        }
        Ok(written)
    }

    fn write_file(&self, output_dir: &Path, extension: &str, content: &str) -> Result<PathBuf> {
        let file_path = output_dir.join(format!("{}.{}", self.file_name, extension));
        let mut file = File::create(&file_path)
            .context(format!("Failed to create file: {:?}", file_path))?;
        file.write_all(content.as_bytes())
            .context(format!("Failed to write to file: {:?}", file_path))?;

        info!("Generated file: {:?}", file_path);
        Ok(file_path)
    }
}
