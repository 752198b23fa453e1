use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fs, io, path::PathBuf};
use validator::{Validate, ValidationError};

use crate::parameters::ParameterInput;
use crate::stacks::StackKind;

pub const DEFAULT_LOCATION: &str = "./config.yaml";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfigFile {
    pub location: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfigEntry {
    pub stack: StackKind,

    #[validate(required, length(min = 1))]
    pub stack_name: Option<String>,

    pub region: Option<String>,

    #[validate(custom = "validate_template_file")]
    pub template: ConfigFile,

    #[validate(custom = "validate_parameters_file")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_file: Option<ConfigFile>,

    #[serde(default)]
    pub parameters: IndexMap<String, ParameterInput>,
}

pub type Config = Vec<ConfigEntry>;

pub fn parse(path: &PathBuf) -> Result<Config, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let config: Config = match serde_yaml::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    for config_entry in &config {
        match config_entry.validate() {
            Ok(_) => (),
            Err(error) => return Err(Error::ValidationError(error.to_string())),
        }
    }

    return Ok(config);
}

fn validate_template_file(template_file: &ConfigFile) -> Result<(), ValidationError> {
    let file_extension = match template_file.location.extension() {
        Some(extension) => extension,
        None => {
            return Err(ValidationError::new(
                "Unable to parse the extension of the template file location",
            ))
        }
    };
    if file_extension != "json" && file_extension != "yaml" && file_extension != "yml" {
        return Err(ValidationError::new(
            "The template file location has to end with `.json`, `.yaml` or `.yml`",
        ));
    }

    return Ok(());
}

fn validate_parameters_file(parameters_file: &ConfigFile) -> Result<(), ValidationError> {
    let file_extension = match parameters_file.location.extension() {
        Some(extension) => extension,
        None => {
            return Err(ValidationError::new(
                "Unable to parse the extension of the parameters file location",
            ))
        }
    };
    if file_extension != "json" {
        return Err(ValidationError::new(
            "The parameters file location has to end with `.json`",
        ));
    }

    return Ok(());
}
