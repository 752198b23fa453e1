use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::check::{self, Issue};
use crate::parameters::{self, ParameterInput, ParameterValue};
use crate::stacks::StackKind;
use crate::template::{builder, Template};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Failed to build the {stack} template: {source}")]
    Build {
        stack: StackKind,
        source: builder::Error,
    },

    #[error("The {stack} template has {} unresolved reference(s)", .issues.len())]
    Integrity { stack: StackKind, issues: Vec<Issue> },

    #[error(transparent)]
    Parameters(#[from] parameters::Error),
}

/// A checked template together with the parameter values to deploy it with.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendering {
    pub stack: StackKind,
    pub template: Template,
    pub parameters: Vec<ParameterValue>,
}

pub fn template(stack: StackKind, region: Option<&str>) -> Result<Template, Error> {
    let template = match stack.template() {
        Ok(template) => template,
        Err(source) => return Err(Error::Build { stack, source }),
    };

    let issues = check::check(&template, region);
    for issue in &issues {
        warn!(%stack, "{}", issue);
    }
    if issues.iter().any(Issue::is_fatal) {
        return Err(Error::Integrity { stack, issues });
    }

    debug!(
        %stack,
        parameters = template.parameters.len(),
        resources = template.resources.len(),
        outputs = template.outputs.len(),
        "Template built"
    );
    return Ok(template);
}

pub fn render(
    stack: StackKind,
    region: Option<&str>,
    provided: &IndexMap<String, ParameterInput>,
) -> Result<Rendering, Error> {
    let template = template(stack, region)?;
    let parameters = parameters::resolve(&template, provided)?;

    return Ok(Rendering {
        stack,
        template,
        parameters,
    });
}
