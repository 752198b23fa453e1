//! Constructors for CloudFormation intrinsic functions.

use serde_json::{json, Value};

pub const AWS_ACCOUNT_ID: &str = "AWS::AccountId";
pub const AWS_NOTIFICATION_ARNS: &str = "AWS::NotificationARNs";
pub const AWS_NO_VALUE: &str = "AWS::NoValue";
pub const AWS_PARTITION: &str = "AWS::Partition";
pub const AWS_REGION: &str = "AWS::Region";
pub const AWS_STACK_ID: &str = "AWS::StackId";
pub const AWS_STACK_NAME: &str = "AWS::StackName";
pub const AWS_URL_SUFFIX: &str = "AWS::URLSuffix";

pub const PSEUDO_PARAMETERS: [&str; 8] = [
    AWS_ACCOUNT_ID,
    AWS_NOTIFICATION_ARNS,
    AWS_NO_VALUE,
    AWS_PARTITION,
    AWS_REGION,
    AWS_STACK_ID,
    AWS_STACK_NAME,
    AWS_URL_SUFFIX,
];

pub const REF: &str = "Ref";
pub const GET_ATT: &str = "Fn::GetAtt";
pub const FIND_IN_MAP: &str = "Fn::FindInMap";
pub const SELECT: &str = "Fn::Select";
pub const JOIN: &str = "Fn::Join";
pub const BASE64: &str = "Fn::Base64";

pub fn is_pseudo_parameter(name: &str) -> bool {
    PSEUDO_PARAMETERS.contains(&name)
}

pub fn reference(logical_id: &str) -> Value {
    json!({ REF: logical_id })
}

/// `attribute` may itself be dotted, e.g. `Endpoint.Address`.
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ GET_ATT: [logical_id, attribute] })
}

pub fn select(index: usize, list: Value) -> Value {
    json!({ SELECT: [index.to_string(), list] })
}

pub fn find_in_map(
    mapping: &str,
    top_key: impl Into<Value>,
    second_key: impl Into<Value>,
) -> Value {
    json!({ FIND_IN_MAP: [mapping, top_key.into(), second_key.into()] })
}

pub fn join<I, V>(delimiter: &str, parts: I) -> Value
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let parts: Vec<Value> = parts.into_iter().map(Into::into).collect();
    json!({ JOIN: [delimiter, parts] })
}

pub fn base64(value: impl Into<Value>) -> Value {
    json!({ BASE64: value.into() })
}

/// Splits a single-key object into its intrinsic function name and argument.
pub fn as_intrinsic(value: &Value) -> Option<(&str, &Value)> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    let (name, argument) = object.iter().next()?;
    if name == REF || name.starts_with("Fn::") {
        return Some((name.as_str(), argument));
    }

    None
}
