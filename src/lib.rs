//! CloudFormation templates for the LAMP stacks.
//!
//! Each stack is declared once as a [`template::Template`], checked for
//! dangling references by [`check`], and serialized deterministically.

pub mod check;
pub mod config;
pub mod logger;
pub mod parameters;
pub mod render;
pub mod stacks;
pub mod template;
#[cfg(feature = "aws")]
pub mod validate;
pub mod writer;

pub use render::{render, Rendering};
pub use stacks::StackKind;
pub use template::Template;
