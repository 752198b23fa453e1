use super::{Mapping, Output, Parameter, Resource, Template};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Logical ID {0} is declared more than once")]
    DuplicateLogicalId(String),

    #[error("Logical ID {0} must be alphanumeric")]
    InvalidLogicalId(String),

    #[error("Template declares no resources")]
    NoResources,
}

/// Collects declarations and checks them once in [`TemplateBuilder::build`].
///
/// Parameters and resources share one namespace, mappings and outputs each
/// have their own.
pub struct TemplateBuilder {
    template: Template,
    errors: Vec<Error>,
}

impl TemplateBuilder {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            template: Template::new(description),
            errors: Vec::new(),
        }
    }

    pub fn parameter(mut self, logical_id: &str, parameter: Parameter) -> Self {
        self.admit(logical_id, self.template.is_declared(logical_id));
        self.template
            .parameters
            .entry(String::from(logical_id))
            .or_insert(parameter);
        self
    }

    pub fn mapping(mut self, name: &str, mapping: Mapping) -> Self {
        self.admit(name, self.template.mappings.contains_key(name));
        self.template
            .mappings
            .entry(String::from(name))
            .or_insert(mapping);
        self
    }

    pub fn resource(mut self, logical_id: &str, resource: Resource) -> Self {
        self.admit(logical_id, self.template.is_declared(logical_id));
        self.template
            .resources
            .entry(String::from(logical_id))
            .or_insert(resource);
        self
    }

    pub fn output(mut self, name: &str, output: Output) -> Self {
        self.admit(name, self.template.outputs.contains_key(name));
        self.template
            .outputs
            .entry(String::from(name))
            .or_insert(output);
        self
    }

    pub fn build(mut self) -> Result<Template, Error> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        if self.template.resources.is_empty() {
            return Err(Error::NoResources);
        }

        return Ok(self.template);
    }

    fn admit(&mut self, logical_id: &str, taken: bool) {
        if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            self.errors
                .push(Error::InvalidLogicalId(String::from(logical_id)));
        } else if taken {
            self.errors
                .push(Error::DuplicateLogicalId(String::from(logical_id)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::intrinsic::reference;
    use super::super::{Mapping, Output, Parameter, ParameterType, Resource};
    use super::{Error, TemplateBuilder};

    #[test]
    fn builds_in_declaration_order() {
        let template = TemplateBuilder::new("ordered")
            .parameter("Zeta", Parameter::new(ParameterType::String))
            .parameter("Alpha", Parameter::new(ParameterType::String))
            .resource("Second", Resource::new("AWS::SNS::Topic"))
            .resource("First", Resource::new("AWS::SNS::Topic"))
            .output("Topic", Output::new(reference("First")))
            .build()
            .unwrap();

        let parameters: Vec<&str> = template.parameters.keys().map(String::as_str).collect();
        let resources: Vec<&str> = template.resources.keys().map(String::as_str).collect();
        assert_eq!(vec!["Zeta", "Alpha"], parameters);
        assert_eq!(vec!["Second", "First"], resources);
        assert_eq!(Some(String::from("ordered")), template.description);
    }

    #[test]
    fn parameter_and_resource_share_namespace() {
        let result = TemplateBuilder::new("clash")
            .parameter("Database", Parameter::new(ParameterType::String))
            .resource("Database", Resource::new("AWS::RDS::DBInstance"))
            .build();

        assert_eq!(
            Err(Error::DuplicateLogicalId(String::from("Database"))),
            result
        );
    }

    #[test]
    fn duplicate_resource_keeps_first_declaration_and_fails() {
        let result = TemplateBuilder::new("dup")
            .resource("Topic", Resource::new("AWS::SNS::Topic"))
            .resource("Topic", Resource::new("AWS::SQS::Queue"))
            .build();

        assert_eq!(Err(Error::DuplicateLogicalId(String::from("Topic"))), result);
    }

    #[test]
    fn mappings_have_their_own_namespace() {
        let result = TemplateBuilder::new("namespaces")
            .mapping("Shared", Mapping::new().entry("a", "b", "c"))
            .parameter("Shared", Parameter::new(ParameterType::String))
            .resource("Topic", Resource::new("AWS::SNS::Topic"))
            .output("Shared", Output::new(reference("Topic")))
            .build();

        assert_eq!(true, result.is_ok());
    }

    #[test]
    fn rejects_non_alphanumeric_ids() {
        let result = TemplateBuilder::new("invalid")
            .resource("Web-Server", Resource::new("AWS::EC2::Instance"))
            .build();

        assert_eq!(
            Err(Error::InvalidLogicalId(String::from("Web-Server"))),
            result
        );
    }

    #[test]
    fn requires_resources() {
        let result = TemplateBuilder::new("empty")
            .parameter("Name", Parameter::new(ParameterType::String))
            .build();

        assert_eq!(Err(Error::NoResources), result);
    }
}
