//! Turns caller-provided values into a CloudFormation parameters file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::template::Template;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("Parameter {0} is not declared by the template")]
    UnknownParameter(String),
}

/// A value as written in the context file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterInput {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Flag(bool),
    List(Vec<ParameterInput>),
}

impl ParameterInput {
    /// CloudFormation receives every parameter as a string; lists are comma joined.
    pub fn to_parameter_value(&self) -> String {
        match self {
            ParameterInput::Text(text) => text.clone(),
            ParameterInput::Integer(number) => number.to_string(),
            ParameterInput::Decimal(number) => number.to_string(),
            ParameterInput::Flag(flag) => flag.to_string(),
            ParameterInput::List(items) => items
                .iter()
                .map(ParameterInput::to_parameter_value)
                .collect::<Vec<String>>()
                .join(","),
        }
    }

    /// Blank text and lists of blanks carry no value.
    pub fn is_blank(&self) -> bool {
        match self {
            ParameterInput::Text(text) => text.trim().is_empty(),
            ParameterInput::List(items) => items.iter().all(ParameterInput::is_blank),
            _ => false,
        }
    }
}

impl From<&str> for ParameterInput {
    fn from(text: &str) -> Self {
        ParameterInput::Text(String::from(text))
    }
}

/// One entry of the `--parameters file://` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterValue {
    pub parameter_key: String,
    pub parameter_value: String,
}

/// Resolves `provided` against the parameters `template` declares.
///
/// Values come out in declaration order. Parameters with a default that were
/// not provided are left out so that CloudFormation applies the default. A
/// required parameter given a blank value counts as missing.
pub fn resolve(
    template: &Template,
    provided: &IndexMap<String, ParameterInput>,
) -> Result<Vec<ParameterValue>, Error> {
    if let Some(unknown) = provided
        .keys()
        .find(|name| !template.parameters.contains_key(name.as_str()))
    {
        return Err(Error::UnknownParameter(unknown.clone()));
    }

    let missing: Vec<String> = template
        .required_parameters()
        .filter(|(name, _)| match provided.get(name.as_str()) {
            Some(input) => input.is_blank(),
            None => true,
        })
        .map(|(name, _)| name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingParameters(missing));
    }

    let values = template
        .parameters
        .keys()
        .filter_map(|name| {
            provided.get(name).map(|input| ParameterValue {
                parameter_key: name.clone(),
                parameter_value: input.to_parameter_value(),
            })
        })
        .collect();

    return Ok(values);
}
