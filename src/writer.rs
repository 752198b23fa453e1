use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ConfigEntry;
use crate::parameters::ParameterValue;
use crate::render::Rendering;
use crate::template::{self, Template};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Unable to write {path}: {reason}")]
    WriteError { path: String, reason: String },

    #[error(transparent)]
    Template(#[from] template::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    /// `.yaml` and `.yml` select YAML, anything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

pub fn serialize(template: &Template, format: Format) -> Result<String, Error> {
    let contents = match format {
        Format::Json => template.to_json()?,
        Format::Yaml => template.to_yaml()?,
    };

    return Ok(contents);
}

pub fn write(config_entry: &ConfigEntry, rendering: &Rendering) -> Result<(), Error> {
    let location = &config_entry.template.location;
    write_template(location, &rendering.template, Format::from_path(location))?;

    if let Some(parameters_file) = &config_entry.parameters_file {
        write_parameters(&parameters_file.location, &rendering.parameters)?;
    }

    return Ok(());
}

pub fn write_template(path: &PathBuf, template: &Template, format: Format) -> Result<(), Error> {
    let file_contents = serialize(template, format)?;
    write_file(path, &file_contents)?;

    info!(path = %path.display(), ?format, "Template written");
    return Ok(());
}

fn write_parameters(path: &PathBuf, parameters: &Vec<ParameterValue>) -> Result<(), Error> {
    let mut file_contents = match serde_json::to_string_pretty(parameters) {
        Ok(contents) => contents,
        Err(error) => return Err(Error::SerializationError(error.to_string())),
    };
    file_contents.push('\n');
    write_file(path, &file_contents)?;

    info!(path = %path.display(), count = parameters.len(), "Parameters written");
    return Ok(());
}

fn write_file(path: &PathBuf, contents: &str) -> Result<(), Error> {
    let to_error = |error: std::io::Error| Error::WriteError {
        path: path.display().to_string(),
        reason: error.to_string(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    fs::write(path, contents).map_err(to_error)
}
