pub mod lamp;
pub mod lamp_multi_az;
pub mod mappings;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::template::{builder, Template};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StackKind {
    /// Single EC2 web server and a MariaDB RDS instance
    Lamp,
    /// Load balanced auto-scaling web tier and a MySQL RDS instance
    LampMultiAz,
}

impl StackKind {
    pub const ALL: [StackKind; 2] = [StackKind::Lamp, StackKind::LampMultiAz];

    pub fn name(self) -> &'static str {
        match self {
            StackKind::Lamp => "lamp",
            StackKind::LampMultiAz => "lamp-multi-az",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StackKind::Lamp => lamp::DESCRIPTION,
            StackKind::LampMultiAz => lamp_multi_az::DESCRIPTION,
        }
    }

    pub fn template(self) -> Result<Template, builder::Error> {
        match self {
            StackKind::Lamp => lamp::template(),
            StackKind::LampMultiAz => lamp_multi_az::template(),
        }
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::StackKind;

    #[test]
    fn names_match_serde_names() {
        for kind in StackKind::ALL {
            let yaml = serde_yaml::to_string(&kind).unwrap();
            assert_eq!(kind.name(), yaml.trim());

            let parsed: StackKind = serde_yaml::from_str(kind.name()).unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn every_stack_builds() {
        for kind in StackKind::ALL {
            let template = kind.template().unwrap();
            assert_eq!(Some(String::from(kind.description())), template.description);
        }
    }
}
