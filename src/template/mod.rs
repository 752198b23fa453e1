//! In-memory model of a CloudFormation template.
//!
//! Every section keeps declaration order so that serializing the same
//! template twice yields byte-identical output.

pub mod builder;
pub mod intrinsic;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use builder::TemplateBuilder;

pub const FORMAT_VERSION: &str = "2010-09-09";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mappings: IndexMap<String, Mapping>,

    pub resources: IndexMap<String, Resource>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: String::from(FORMAT_VERSION),
            description: Some(description.into()),
            parameters: IndexMap::new(),
            mappings: IndexMap::new(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Whether `logical_id` can be the target of a `Ref`.
    pub fn is_declared(&self, logical_id: &str) -> bool {
        self.parameters.contains_key(logical_id) || self.resources.contains_key(logical_id)
    }

    pub fn has_resource(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = (&String, &Parameter)> {
        self.parameters
            .iter()
            .filter(|(_, parameter)| parameter.is_required())
    }

    pub fn to_json(&self) -> Result<String, Error> {
        let mut contents = match serde_json::to_string_pretty(self) {
            Ok(contents) => contents,
            Err(error) => return Err(Error::SerializationError(error.to_string())),
        };
        contents.push('\n');

        return Ok(contents);
    }

    pub fn to_yaml(&self) -> Result<String, Error> {
        serde_yaml::to_string(self).map_err(|error| Error::SerializationError(error.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    #[default]
    String,
    Number,
    CommaDelimitedList,
    #[serde(rename = "AWS::EC2::VPC::Id")]
    VpcId,
    #[serde(rename = "List<AWS::EC2::Subnet::Id>")]
    SubnetIdList,
    #[serde(rename = "AWS::EC2::KeyPair::KeyName")]
    KeyPairName,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub kind: ParameterType,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_echo: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_description: Option<String>,
}

impl Parameter {
    pub fn new(kind: ParameterType) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.allowed_pattern = Some(pattern.into());
        self
    }

    pub fn length(mut self, min: u32, max: u32) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn value_range(mut self, min: u64, max: u64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn constraint_description(mut self, description: impl Into<String>) -> Self {
        self.constraint_description = Some(description.into());
        self
    }

    /// Masks the value in the console and in `DescribeStacks` responses.
    pub fn no_echo(mut self) -> Self {
        self.no_echo = true;
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Two-level literal lookup table, read with `Fn::FindInMap`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping(IndexMap<String, IndexMap<String, String>>);

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(
        mut self,
        top_key: impl Into<String>,
        second_key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.0
            .entry(top_key.into())
            .or_default()
            .insert(second_key.into(), value.into());
        self
    }

    pub fn row(&self, top_key: &str) -> Option<&IndexMap<String, String>> {
        self.0.get(top_key)
    }

    pub fn lookup(&self, top_key: &str, second_key: &str) -> Option<&str> {
        self.row(top_key)
            .and_then(|row| row.get(second_key))
            .map(String::as_str)
    }

    pub fn top_keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every value stored under `second_key`, across all rows.
    pub fn column(&self, second_key: &str) -> Vec<&str> {
        self.0
            .values()
            .filter_map(|row| row.get(second_key))
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_policy: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<Value>,
}

impl Resource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            depends_on: Vec::new(),
            metadata: IndexMap::new(),
            properties: IndexMap::new(),
            creation_policy: None,
            update_policy: None,
        }
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn creation_policy(mut self, policy: Value) -> Self {
        self.creation_policy = Some(policy);
        self
    }

    pub fn update_policy(mut self, policy: Value) -> Self {
        self.update_policy = Some(policy);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub value: Value,
}

impl Output {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            description: None,
            value: value.into(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::intrinsic::reference;
    use super::{Mapping, Output, Parameter, ParameterType, Resource, Template};

    fn sample() -> Template {
        let mut template = Template::new("sample");
        template.parameters.insert(
            String::from("Secret"),
            Parameter::new(ParameterType::String).no_echo(),
        );
        template.parameters.insert(
            String::from("Size"),
            Parameter::new(ParameterType::Number).default_value("5"),
        );
        template.resources.insert(
            String::from("Bucket"),
            Resource::new("AWS::S3::Bucket").property("BucketName", reference("Secret")),
        );
        template
            .outputs
            .insert(String::from("Name"), Output::new(reference("Bucket")));
        template
    }

    #[test]
    fn serializes_sections_in_declaration_order() {
        let contents = sample().to_json().unwrap();

        let version = contents.find("AWSTemplateFormatVersion").unwrap();
        let parameters = contents.find("\"Parameters\"").unwrap();
        let resources = contents.find("\"Resources\"").unwrap();
        let outputs = contents.find("\"Outputs\"").unwrap();
        assert!(version < parameters);
        assert!(parameters < resources);
        assert!(resources < outputs);
        assert_eq!(false, contents.contains("\"Mappings\""));
        assert_eq!(true, contents.ends_with('\n'));
    }

    #[test]
    fn no_echo_only_emitted_when_set() {
        let value = serde_json::to_value(sample()).unwrap();

        assert_eq!(json!(true), value["Parameters"]["Secret"]["NoEcho"]);
        assert_eq!(None, value["Parameters"]["Size"].get("NoEcho"));
        assert_eq!(json!("Number"), value["Parameters"]["Size"]["Type"]);
    }

    #[test]
    fn parameter_types_use_aws_names() {
        let value = serde_json::to_value(ParameterType::SubnetIdList).unwrap();
        assert_eq!(json!("List<AWS::EC2::Subnet::Id>"), value);
    }

    #[test]
    fn required_parameters_have_no_default() {
        let template = sample();
        let required: Vec<&String> = template.required_parameters().map(|(name, _)| name).collect();
        assert_eq!(vec!["Secret"], required);
    }

    #[test]
    fn mapping_lookup() {
        let mapping = Mapping::new()
            .entry("us-east-1", "HVM64", "ami-1")
            .entry("us-east-1", "HVMG2", "ami-2")
            .entry("eu-west-1", "HVM64", "ami-3");

        assert_eq!(Some("ami-2"), mapping.lookup("us-east-1", "HVMG2"));
        assert_eq!(None, mapping.lookup("eu-west-1", "HVMG2"));
        assert_eq!(None, mapping.lookup("ap-south-1", "HVM64"));
        assert_eq!(vec!["ami-1", "ami-3"], mapping.column("HVM64"));
        assert_eq!(2, mapping.len());
    }

    #[test]
    fn json_and_yaml_deserialize_back() {
        let template = sample();

        let from_json: Template = serde_json::from_str(&template.to_json().unwrap()).unwrap();
        let from_yaml: Template = serde_yaml::from_str(&template.to_yaml().unwrap()).unwrap();
        assert_eq!(template, from_json);
        assert_eq!(template, from_yaml);
    }
}
