//! Static reference checks over a built template.
//!
//! Only what can be decided without AWS is checked: logical IDs behind
//! `Ref`, `Fn::GetAtt` and `DependsOn`, and the keys `Fn::FindInMap` can be
//! asked for. A key whose possible values cannot be derived statically is
//! left for CloudFormation to reject.
//!
//! Lookups whose row is known, such as a region given by the caller, must
//! also not land on the `NOT_SUPPORTED` placeholder. Without a region every
//! row is possible, so placeholders are not reported.

use indexmap::IndexSet;
use serde_json::Value;

use crate::stacks::mappings::NOT_SUPPORTED;
use crate::template::intrinsic::{self, AWS_REGION, FIND_IN_MAP, GET_ATT, REF};
use crate::template::{Mapping, Template};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    #[error("{location}: Ref to undeclared {target}")]
    UnresolvedRef { location: String, target: String },

    #[error("{location}: Fn::GetAtt on {target}, which is not a resource")]
    UnresolvedGetAtt { location: String, target: String },

    #[error("{location}: DependsOn names undeclared resource {target}")]
    UnresolvedDependency { location: String, target: String },

    #[error("{location}: mapping {mapping} is not declared")]
    UnknownMapping { location: String, mapping: String },

    #[error("{location}: mapping {mapping} has no key {key}")]
    MissingMappingKey {
        location: String,
        mapping: String,
        key: String,
    },

    #[error("{location}: mapping {mapping} has no usable value for {key}")]
    UnsupportedMappingValue {
        location: String,
        mapping: String,
        key: String,
    },

    #[error("{location}: malformed {function} arguments")]
    MalformedIntrinsic { location: String, function: String },
}

impl Issue {
    /// A placeholder is only hit when the parameter selecting it takes that
    /// value at deploy time, so the template itself is still sound.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Issue::UnsupportedMappingValue { .. })
    }
}

/// Checks every reference in `template`.
///
/// With a `region`, `AWS::Region` resolves to it and mapping lookups keyed
/// by region are checked for that region only. Without one, they are checked
/// against every row of the mapping.
pub fn check(template: &Template, region: Option<&str>) -> Vec<Issue> {
    let mut checker = Checker {
        template,
        region,
        issues: Vec::new(),
    };

    for (logical_id, resource) in &template.resources {
        let base = format!("Resources.{}", logical_id);

        for (index, dependency) in resource.depends_on.iter().enumerate() {
            if !template.has_resource(dependency) {
                checker.issues.push(Issue::UnresolvedDependency {
                    location: format!("{}.DependsOn[{}]", base, index),
                    target: dependency.clone(),
                });
            }
        }
        for (key, value) in &resource.metadata {
            checker.visit(value, &format!("{}.Metadata.{}", base, key));
        }
        for (key, value) in &resource.properties {
            checker.visit(value, &format!("{}.Properties.{}", base, key));
        }
        if let Some(policy) = &resource.creation_policy {
            checker.visit(policy, &format!("{}.CreationPolicy", base));
        }
        if let Some(policy) = &resource.update_policy {
            checker.visit(policy, &format!("{}.UpdatePolicy", base));
        }
    }

    for (name, output) in &template.outputs {
        checker.visit(&output.value, &format!("Outputs.{}.Value", name));
    }

    checker.issues
}

struct Checker<'a> {
    template: &'a Template,
    region: Option<&'a str>,
    issues: Vec<Issue>,
}

impl<'a> Checker<'a> {
    fn visit(&mut self, value: &Value, location: &str) {
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.visit(item, &format!("{}[{}]", location, index));
                }
            }
            Value::Object(object) => {
                if let Some((function, argument)) = intrinsic::as_intrinsic(value) {
                    match function {
                        REF => self.check_ref(argument, location),
                        GET_ATT => self.check_get_att(argument, location),
                        FIND_IN_MAP => self.check_find_in_map(argument, location),
                        _ => {}
                    }
                    self.visit(argument, &format!("{}.{}", location, function));
                    return;
                }
                for (key, item) in object {
                    self.visit(item, &format!("{}.{}", location, key));
                }
            }
            _ => {}
        }
    }

    fn check_ref(&mut self, argument: &Value, location: &str) {
        let target = match argument.as_str() {
            Some(target) => target,
            None => return self.malformed(REF, location),
        };

        if !intrinsic::is_pseudo_parameter(target) && !self.template.is_declared(target) {
            self.issues.push(Issue::UnresolvedRef {
                location: String::from(location),
                target: String::from(target),
            });
        }
    }

    fn check_get_att(&mut self, argument: &Value, location: &str) {
        let target = match argument {
            Value::Array(items) if items.len() == 2 => items[0].as_str(),
            Value::String(dotted) => dotted.split_once('.').map(|(target, _)| target),
            _ => None,
        };
        let target = match target {
            Some(target) => target,
            None => return self.malformed(GET_ATT, location),
        };

        if !self.template.has_resource(target) {
            self.issues.push(Issue::UnresolvedGetAtt {
                location: String::from(location),
                target: String::from(target),
            });
        }
    }

    fn check_find_in_map(&mut self, argument: &Value, location: &str) {
        let (name, top, second) = match argument.as_array().map(Vec::as_slice) {
            Some([Value::String(name), top, second]) => (name.as_str(), top, second),
            _ => return self.malformed(FIND_IN_MAP, location),
        };
        let mapping = match self.template.mappings.get(name) {
            Some(mapping) => mapping,
            None => {
                self.issues.push(Issue::UnknownMapping {
                    location: String::from(location),
                    mapping: String::from(name),
                });
                return;
            }
        };

        let tops = self.candidates(top);
        let seconds = self.candidates(second);
        let mut missing = Vec::new();
        let mut unsupported = Vec::new();

        match tops {
            Some(tops) => {
                for top in &tops {
                    let row = match mapping.row(top) {
                        Some(row) => row,
                        None => {
                            missing.push(top.clone());
                            continue;
                        }
                    };
                    for second in seconds.iter().flatten() {
                        match row.get(second) {
                            Some(value) if value == NOT_SUPPORTED => {
                                unsupported.push(format!("{}.{}", top, second))
                            }
                            Some(_) => {}
                            None => missing.push(format!("{}.{}", top, second)),
                        }
                    }
                }
            }
            // Any row may be selected at deploy time, so each must carry the key.
            None => {
                for top in mapping.top_keys() {
                    for second in seconds.iter().flatten() {
                        if mapping.lookup(top, second).is_none() {
                            missing.push(format!("{}.{}", top, second));
                        }
                    }
                }
            }
        }

        for key in missing {
            self.issues.push(Issue::MissingMappingKey {
                location: String::from(location),
                mapping: String::from(name),
                key,
            });
        }
        for key in unsupported {
            self.issues.push(Issue::UnsupportedMappingValue {
                location: String::from(location),
                mapping: String::from(name),
                key,
            });
        }
    }

    /// Every value `expression` can evaluate to, when that set is known.
    fn candidates(&self, expression: &Value) -> Option<Vec<String>> {
        if let Value::String(literal) = expression {
            return Some(vec![literal.clone()]);
        }

        match intrinsic::as_intrinsic(expression)? {
            (REF, Value::String(target)) if target == AWS_REGION => {
                self.region.map(|region| vec![String::from(region)])
            }
            (REF, Value::String(target)) => {
                let parameter = self.template.parameters.get(target)?;
                if parameter.allowed_values.is_empty() {
                    return None;
                }
                Some(parameter.allowed_values.clone())
            }
            (FIND_IN_MAP, Value::Array(arguments)) if arguments.len() == 3 => {
                let mapping = self.template.mappings.get(arguments[0].as_str()?)?;
                let seconds = self.candidates(&arguments[2])?;
                let tops = self.candidates(&arguments[1]);

                Some(values_of(mapping, tops, &seconds))
            }
            _ => None,
        }
    }

    fn malformed(&mut self, function: &str, location: &str) {
        self.issues.push(Issue::MalformedIntrinsic {
            location: String::from(location),
            function: String::from(function),
        });
    }
}

fn values_of(mapping: &Mapping, tops: Option<Vec<String>>, seconds: &[String]) -> Vec<String> {
    let tops: Vec<String> = match tops {
        Some(tops) => tops,
        None => mapping.top_keys().map(String::from).collect(),
    };

    let mut values = IndexSet::new();
    for top in &tops {
        for second in seconds {
            if let Some(value) = mapping.lookup(top, second) {
                values.insert(String::from(value));
            }
        }
    }

    values.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{check, Issue};
    use crate::stacks::StackKind;
    use crate::template::intrinsic::{find_in_map, get_att, reference, AWS_REGION};
    use crate::template::{
        Mapping, Output, Parameter, ParameterType, Resource, Template, TemplateBuilder,
    };

    fn with_resource(resource: Resource) -> Template {
        TemplateBuilder::new("broken")
            .parameter(
                "Size",
                Parameter::new(ParameterType::String).allowed_values(["small", "large"]),
            )
            .parameter("Free", Parameter::new(ParameterType::String))
            .mapping(
                "SizeMap",
                Mapping::new()
                    .entry("small", "Arch", "HVM64")
                    .entry("large", "Arch", "HVMG2"),
            )
            .mapping(
                "RegionMap",
                Mapping::new()
                    .entry("us-east-1", "HVM64", "ami-1")
                    .entry("us-east-1", "HVMG2", "ami-2")
                    .entry("eu-west-1", "HVM64", "ami-3"),
            )
            .resource("Queue", Resource::new("AWS::SQS::Queue"))
            .resource("Subject", resource)
            .build()
            .unwrap()
    }

    #[test]
    fn shipped_stacks_are_consistent() {
        for kind in StackKind::ALL {
            let template = kind.template().unwrap();
            assert_eq!(Vec::<Issue>::new(), check(&template, None), "{}", kind);
            assert_eq!(
                Vec::<Issue>::new(),
                check(&template, Some("eu-west-1")),
                "{}",
                kind
            );
        }
    }

    #[test]
    fn unknown_region_is_reported_for_region_keyed_lookups() {
        let template = StackKind::LampMultiAz.template().unwrap();

        let issues = check(&template, Some("xx-nowhere-1"));
        assert_eq!(
            vec![Issue::MissingMappingKey {
                location: String::from("Resources.LaunchConfig.Properties.ImageId"),
                mapping: String::from("AWSRegionArch2AMI"),
                key: String::from("xx-nowhere-1"),
            }],
            issues
        );

        // The single instance stack has no region lookups.
        let template = StackKind::Lamp.template().unwrap();
        assert_eq!(Vec::<Issue>::new(), check(&template, Some("xx-nowhere-1")));
    }

    #[test]
    fn region_without_a_gpu_ami_is_reported() {
        // g2 instance types boot HVMG2, which has no AMI in eu-west-3.
        let template = StackKind::LampMultiAz.template().unwrap();

        assert_eq!(
            vec![Issue::UnsupportedMappingValue {
                location: String::from("Resources.LaunchConfig.Properties.ImageId"),
                mapping: String::from("AWSRegionArch2AMI"),
                key: String::from("eu-west-3.HVMG2"),
            }],
            check(&template, Some("eu-west-3"))
        );
        assert_eq!(false, check(&template, Some("eu-west-3"))[0].is_fatal());
        assert_eq!(Vec::<Issue>::new(), check(&template, Some("us-east-1")));
    }

    #[test]
    fn placeholder_under_a_literal_key_is_reported() {
        let template = TemplateBuilder::new("placeholder")
            .mapping(
                "RegionMap",
                Mapping::new()
                    .entry("eu-west-3", "HVM64", "ami-1")
                    .entry("eu-west-3", "HVMG2", "NOT_SUPPORTED"),
            )
            .resource(
                "Subject",
                Resource::new("AWS::SNS::Topic")
                    .property("A", find_in_map("RegionMap", "eu-west-3", "HVMG2"))
                    .property("B", find_in_map("RegionMap", "eu-west-3", "HVM64")),
            )
            .build()
            .unwrap();

        assert_eq!(
            vec![Issue::UnsupportedMappingValue {
                location: String::from("Resources.Subject.Properties.A"),
                mapping: String::from("RegionMap"),
                key: String::from("eu-west-3.HVMG2"),
            }],
            check(&template, None)
        );
    }

    #[test]
    fn reports_unresolved_ref_with_its_location() {
        let template = with_resource(
            Resource::new("AWS::SNS::Topic")
                .property("Tags", json!([{"Key": "a", "Value": reference("Missing")}])),
        );

        assert_eq!(
            vec![Issue::UnresolvedRef {
                location: String::from("Resources.Subject.Properties.Tags[0].Value"),
                target: String::from("Missing"),
            }],
            check(&template, None)
        );
    }

    #[test]
    fn pseudo_parameters_resolve() {
        let template = with_resource(
            Resource::new("AWS::SNS::Topic").property("TopicName", reference(AWS_REGION)),
        );

        assert_eq!(Vec::<Issue>::new(), check(&template, None));
    }

    #[test]
    fn get_att_must_target_a_resource() {
        let template = with_resource(
            Resource::new("AWS::SNS::Topic")
                .property("A", get_att("Queue", "Arn"))
                .property("B", get_att("Size", "Arn"))
                .property("C", json!({"Fn::GetAtt": "Nothing.Arn"})),
        );

        assert_eq!(
            vec![
                Issue::UnresolvedGetAtt {
                    location: String::from("Resources.Subject.Properties.B"),
                    target: String::from("Size"),
                },
                Issue::UnresolvedGetAtt {
                    location: String::from("Resources.Subject.Properties.C"),
                    target: String::from("Nothing"),
                },
            ],
            check(&template, None)
        );
    }

    #[test]
    fn depends_on_must_target_a_resource() {
        let template = with_resource(
            Resource::new("AWS::SNS::Topic")
                .depends_on("Queue")
                .depends_on("Free"),
        );

        assert_eq!(
            vec![Issue::UnresolvedDependency {
                location: String::from("Resources.Subject.DependsOn[1]"),
                target: String::from("Free"),
            }],
            check(&template, None)
        );
    }

    #[test]
    fn find_in_map_checks_mapping_and_literal_keys() {
        let template = with_resource(
            Resource::new("AWS::SNS::Topic")
                .property("A", find_in_map("NoSuchMap", "small", "Arch"))
                .property("B", find_in_map("SizeMap", "medium", "Arch"))
                .property("C", find_in_map("SizeMap", "small", "Bits")),
        );

        assert_eq!(
            vec![
                Issue::UnknownMapping {
                    location: String::from("Resources.Subject.Properties.A"),
                    mapping: String::from("NoSuchMap"),
                },
                Issue::MissingMappingKey {
                    location: String::from("Resources.Subject.Properties.B"),
                    mapping: String::from("SizeMap"),
                    key: String::from("medium"),
                },
                Issue::MissingMappingKey {
                    location: String::from("Resources.Subject.Properties.C"),
                    mapping: String::from("SizeMap"),
                    key: String::from("small.Bits"),
                },
            ],
            check(&template, None)
        );
    }

    #[test]
    fn nested_lookup_keys_come_from_allowed_values() {
        // "large" maps to HVMG2, which eu-west-1 lacks.
        let image = find_in_map(
            "RegionMap",
            reference(AWS_REGION),
            find_in_map("SizeMap", reference("Size"), "Arch"),
        );
        let template =
            with_resource(Resource::new("AWS::EC2::Instance").property("ImageId", image));

        assert_eq!(
            vec![Issue::MissingMappingKey {
                location: String::from("Resources.Subject.Properties.ImageId"),
                mapping: String::from("RegionMap"),
                key: String::from("eu-west-1.HVMG2"),
            }],
            check(&template, None)
        );
        assert_eq!(Vec::<Issue>::new(), check(&template, Some("us-east-1")));
    }

    #[test]
    fn unconstrained_parameters_are_left_to_cloudformation() {
        let template = with_resource(
            Resource::new("AWS::SNS::Topic")
                .property("A", find_in_map("SizeMap", reference("Free"), "Arch")),
        );

        assert_eq!(Vec::<Issue>::new(), check(&template, None));
    }

    #[test]
    fn outputs_and_policies_are_checked() {
        let mut template = with_resource(Resource::new("AWS::SNS::Topic").creation_policy(
            json!({"ResourceSignal": {"Count": reference("Gone")}}),
        ));
        template
            .outputs
            .insert(String::from("Arn"), Output::new(get_att("Missing", "Arn")));

        assert_eq!(
            vec![
                Issue::UnresolvedRef {
                    location: String::from(
                        "Resources.Subject.CreationPolicy.ResourceSignal.Count"
                    ),
                    target: String::from("Gone"),
                },
                Issue::UnresolvedGetAtt {
                    location: String::from("Outputs.Arn.Value"),
                    target: String::from("Missing"),
                },
            ],
            check(&template, None)
        );
    }

    #[test]
    fn malformed_arguments_are_reported() {
        let template = with_resource(
            Resource::new("AWS::SNS::Topic")
                .property("A", json!({"Ref": ["Queue"]}))
                .property("B", json!({"Fn::FindInMap": ["SizeMap", "small"]})),
        );

        let issues = check(&template, None);
        assert_eq!(
            Issue::MalformedIntrinsic {
                location: String::from("Resources.Subject.Properties.A"),
                function: String::from("Ref"),
            },
            issues[0]
        );
        assert_eq!(
            Issue::MalformedIntrinsic {
                location: String::from("Resources.Subject.Properties.B"),
                function: String::from("Fn::FindInMap"),
            },
            issues[1]
        );
    }
}
