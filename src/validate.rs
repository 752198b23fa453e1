//! Remote validation through the CloudFormation `ValidateTemplate` API.
//!
//! Only feeds the template to the service; stacks are never created or
//! updated from here.

use std::fmt;

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudformation::error::{DisplayErrorContext, SdkError};
use tracing::{debug, info};

use crate::config::ConfigEntry;
use crate::render;
use crate::stacks::StackKind;
use crate::template::Template;

/// Largest `TemplateBody` the API accepts inline.
pub const MAX_TEMPLATE_BODY: usize = 51_200;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Service error ocurred: {0}.")]
    ServiceError(String),

    #[error("Unknown error ocurred: {0}.")]
    UnknownError(String),

    #[error("No region configured")]
    NoRegion,

    #[error("Template body is {0} bytes, the limit is {}", MAX_TEMPLATE_BODY)]
    TemplateTooLarge(usize),

    #[error("Service reported parameters {remote:?}, template declares {local:?}")]
    ParameterMismatch {
        remote: Vec<String>,
        local: Vec<String>,
    },

    #[error(transparent)]
    Render(#[from] render::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub stack: StackKind,
    pub region: String,
    pub parameters: Vec<String>,
    pub capabilities: Vec<String>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {}: parameters [{}], capabilities [{}]",
            self.stack,
            self.region,
            self.parameters.join(", "),
            self.capabilities.join(", ")
        )
    }
}

pub struct Validator {
    pub region: Region,

    client: aws_sdk_cloudformation::Client,
}

impl Validator {
    pub async fn new(region: Option<&String>) -> Result<Self, Error> {
        let fallback = match region {
            Some(_) => None,
            None => RegionProviderChain::default_provider().region().await,
        };
        let region = resolve_region(region, fallback)?;

        let region_for_config = region.clone();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_for_config)
            .load()
            .await;
        let client = aws_sdk_cloudformation::Client::new(&sdk_config);

        return Ok(Self { region, client });
    }

    pub async fn validate(&self, stack: StackKind) -> Result<Report, Error> {
        let template = render::template(stack, Some(self.region.as_ref()))?;
        let body = match serde_json::to_string(&template) {
            Ok(body) => body,
            Err(error) => return Err(Error::UnknownError(error.to_string())),
        };
        check_body(&body)?;

        debug!(%stack, region = %self.region, bytes = body.len(), "Validating template");
        let result = self
            .client
            .validate_template()
            .template_body(body)
            .send()
            .await;

        let output = match result {
            Ok(data) => data,
            Err(SdkError::ServiceError(context)) => {
                return Err(Error::ServiceError(context.err().to_string()));
            }
            Err(err) => return Err(Error::UnknownError(DisplayErrorContext(&err).to_string())),
        };

        let remote: Vec<String> = output
            .parameters()
            .iter()
            .filter_map(|parameter| parameter.parameter_key())
            .map(String::from)
            .collect();
        compare_parameters(&remote, &template)?;

        let capabilities = output
            .capabilities()
            .iter()
            .map(|capability| capability.as_str().to_string())
            .collect();

        info!(%stack, region = %self.region, "Template accepted by CloudFormation");
        return Ok(Report {
            stack,
            region: self.region.to_string(),
            parameters: remote,
            capabilities,
        });
    }
}

fn resolve_region(provided: Option<&String>, fallback: Option<Region>) -> Result<Region, Error> {
    return match (provided, fallback) {
        (Some(provided_region), _) => Ok(Region::new(provided_region.clone())),
        (None, Some(region)) => Ok(region),
        (None, None) => Err(Error::NoRegion),
    };
}

fn check_body(body: &str) -> Result<(), Error> {
    if body.len() > MAX_TEMPLATE_BODY {
        return Err(Error::TemplateTooLarge(body.len()));
    }

    return Ok(());
}

/// The service lists parameters in its own order, so both sides are sorted.
fn compare_parameters(remote: &[String], template: &Template) -> Result<(), Error> {
    let mut sorted_remote = remote.to_vec();
    sorted_remote.sort();
    let mut local: Vec<String> = template.parameters.keys().cloned().collect();
    local.sort();

    if sorted_remote != local {
        return Err(Error::ParameterMismatch {
            remote: remote.to_vec(),
            local,
        });
    }

    return Ok(());
}

/// Validates every entry concurrently, each in its own region.
pub async fn validate_all(config: &[ConfigEntry]) -> Vec<Result<Report, Error>> {
    let validations = config.iter().map(|config_entry| async move {
        let validator = Validator::new(config_entry.region.as_ref()).await?;
        validator.validate(config_entry.stack).await
    });

    futures::future::join_all(validations).await
}
