use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cfn_lamp_templates::writer::{self, Format};
use cfn_lamp_templates::{check, config, logger, render, StackKind};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate the LAMP CloudFormation templates", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the stacks this tool can render
    List,

    /// Render a single template to stdout or a file
    Render {
        #[arg(value_enum)]
        stack: StackKind,

        /// Defaults to the output extension, or JSON on stdout
        #[arg(long, value_enum)]
        format: Option<Format>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Region the template will be deployed to, enables region keyed checks
        #[arg(long)]
        region: Option<String>,
    },

    /// Report unresolved references and mapping keys
    Check {
        /// Every stack when empty
        #[arg(value_enum)]
        stacks: Vec<StackKind>,

        #[arg(long)]
        region: Option<String>,
    },

    /// Render every entry of a context file and write its files
    Build {
        #[arg(short, long, default_value = config::DEFAULT_LOCATION)]
        config: PathBuf,
    },

    /// Validate every entry of a context file with CloudFormation
    #[cfg(feature = "aws")]
    Validate {
        #[arg(short, long, default_value = config::DEFAULT_LOCATION)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);
    debug!(?cli, "Parsed arguments");

    match cli.command {
        Command::List => {
            for stack in StackKind::ALL {
                println!("{:<16}{}", stack.name(), stack.description());
            }
        }
        Command::Render {
            stack,
            format,
            output,
            region,
        } => {
            let template = render::template(stack, region.as_deref())?;
            match output {
                Some(path) => {
                    let format = format.unwrap_or_else(|| Format::from_path(&path));
                    writer::write_template(&path, &template, format)
                        .with_context(|| format!("Failed to write the {} template", stack))?;
                }
                None => print!("{}", writer::serialize(&template, format.unwrap_or_default())?),
            }
        }
        Command::Check { stacks, region } => {
            let stacks = if stacks.is_empty() {
                StackKind::ALL.to_vec()
            } else {
                stacks
            };

            let mut fatal = 0;
            for stack in stacks {
                let template = stack
                    .template()
                    .with_context(|| format!("Failed to build the {} template", stack))?;
                let issues = check::check(&template, region.as_deref());
                for issue in &issues {
                    println!("{}: {}", stack, issue);
                }
                if issues.is_empty() {
                    info!(%stack, "No issues found");
                }
                fatal += issues.iter().filter(|issue| issue.is_fatal()).count();
            }
            if fatal > 0 {
                bail!("{} issue(s) found", fatal);
            }
        }
        Command::Build { config } => {
            let entries = config::parse(&config)
                .with_context(|| format!("Failed to read {}", config.display()))?;

            for config_entry in &entries {
                info!(
                    stack = %config_entry.stack,
                    stack_name = config_entry.stack_name.as_deref().unwrap_or_default(),
                    "Rendering"
                );
                let rendering = cfn_lamp_templates::render(
                    config_entry.stack,
                    config_entry.region.as_deref(),
                    &config_entry.parameters,
                )
                .with_context(|| {
                    format!(
                        "Failed to render {}",
                        config_entry.stack_name.as_deref().unwrap_or_default()
                    )
                })?;
                writer::write(config_entry, &rendering)?;
            }
            info!(count = entries.len(), "Build finished");
        }
        #[cfg(feature = "aws")]
        Command::Validate { config } => {
            use cfn_lamp_templates::validate;

            let entries = config::parse(&config)
                .with_context(|| format!("Failed to read {}", config.display()))?;
            let runtime = tokio::runtime::Runtime::new()?;
            let reports = runtime.block_on(validate::validate_all(&entries));

            let mut failures = 0;
            for (config_entry, report) in entries.iter().zip(reports) {
                let stack_name = config_entry.stack_name.as_deref().unwrap_or_default();
                match report {
                    Ok(report) => println!("{}: valid, {}", stack_name, report),
                    Err(error) => {
                        tracing::warn!(stack_name, %error, "Validation failed");
                        println!("{} ({}): {}", stack_name, config_entry.stack, error);
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                bail!("{} template(s) rejected", failures);
            }
        }
    }

    return Ok(());
}
