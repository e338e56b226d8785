use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fhir::{Bundle, FormResource};
use form_core::{
    adapt_rows, assemble, extract_field_schemas, render_rows, Affordance, FormInputs, FormRow,
    RowRegistry, Widget, WidgetKind,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "forms")]
#[command(about = "Offline tools for DSF task and questionnaire forms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the form rows a resource renders to
    Render {
        /// Task or QuestionnaireResponse JSON file
        resource: PathBuf,
    },
    /// List the form rows after adapting them to a profile
    Adapt {
        /// Task JSON file
        resource: PathBuf,
        /// StructureDefinition search Bundle JSON file
        schema: PathBuf,
    },
    /// Apply inputs, validate and print the resource that would be submitted
    Validate {
        /// Task or QuestionnaireResponse JSON file
        resource: PathBuf,
        /// Inputs JSON file (row key to widget values)
        inputs: PathBuf,
        /// StructureDefinition search Bundle JSON file
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Authoring time of a submitted Task (RFC 3339, defaults to now)
        #[arg(long)]
        authored_on: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("form_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { resource } => {
            let resource = load_resource(&resource)?;
            print!("{}", describe_rows(&render_rows(&resource)));
        }
        Commands::Adapt { resource, schema } => {
            let resource = load_resource(&resource)?;
            let registry = prepare_rows(&resource, Some(&schema))?;
            print!("{}", describe_rows(&registry));
        }
        Commands::Validate {
            resource,
            inputs,
            schema,
            authored_on,
        } => {
            let now = match authored_on {
                Some(text) => DateTime::parse_from_rfc3339(&text)
                    .with_context(|| format!("authored-on '{text}'"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            let resource = load_resource(&resource)?;
            match validate(&resource, &inputs, schema.as_deref(), now)? {
                Ok(json) => println!("{json}"),
                Err(report) => {
                    eprint!("{report}");
                    anyhow::bail!("form is invalid");
                }
            }
        }
    }

    Ok(())
}

fn load_resource(path: &Path) -> anyhow::Result<FormResource> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading resource {}", path.display()))?;
    FormResource::parse(&text).with_context(|| format!("parsing resource {}", path.display()))
}

fn load_bundle(path: &Path) -> anyhow::Result<Bundle> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema {}", path.display()))?;
    Bundle::parse(&text).with_context(|| format!("parsing schema {}", path.display()))
}

fn prepare_rows(resource: &FormResource, schema: Option<&Path>) -> anyhow::Result<RowRegistry> {
    let mut registry = render_rows(resource);
    if let Some(path) = schema {
        let schemas = extract_field_schemas(&load_bundle(path)?);
        let adapted = adapt_rows(&mut registry, &schemas);
        tracing::debug!(adapted, "adapted rows from schema");
    }
    Ok(registry)
}

/// Returns the rendered resource JSON, or a per-row error report.
fn validate(
    resource: &FormResource,
    inputs: &Path,
    schema: Option<&Path>,
    now: DateTime<Utc>,
) -> anyhow::Result<Result<String, String>> {
    let mut registry = prepare_rows(resource, schema)?;

    let text = std::fs::read_to_string(inputs)
        .with_context(|| format!("reading inputs {}", inputs.display()))?;
    FormInputs::parse(&text)?.apply(&mut registry)?;

    match assemble(resource, &mut registry, now) {
        Some(assembled) => Ok(Ok(assembled.render()?)),
        None => Ok(Err(error_report(&registry))),
    }
}

fn error_report(registry: &RowRegistry) -> String {
    let mut report = String::new();
    for row in registry.rows() {
        for message in row.errors().messages() {
            report.push_str(&format!("{}: {message}\n", row.key()));
        }
    }
    report
}

fn describe_rows(registry: &RowRegistry) -> String {
    registry.rows().map(describe_row).collect()
}

fn describe_row(row: &FormRow) -> String {
    let widgets: Vec<String> = row.widgets().iter().map(describe_widget).collect();
    let affordance = match row.affordance() {
        Some(Affordance::AddOccurrence) => " [+]",
        Some(Affordance::RemoveOccurrence) => " [-]",
        None => "",
    };
    let cardinality = row
        .cardinality()
        .map(|c| format!(" {c}"))
        .unwrap_or_default();
    let optional = if row.is_optional() { " optional" } else { "" };

    format!(
        "{}\t{}{cardinality}{optional}{affordance}\t{}\n",
        row.key(),
        row.label(),
        widgets.join(" ")
    )
}

fn describe_widget(widget: &Widget) -> String {
    match widget.kind() {
        WidgetKind::BooleanTrue | WidgetKind::BooleanFalse => {
            let mark = if widget.checked() { "x" } else { " " };
            format!("{}[{mark}]", widget.kind().tag())
        }
        kind => match widget.placeholder() {
            Some(placeholder) => format!("{}={:?}~{placeholder:?}", kind.tag(), widget.value()),
            None => format!("{}={:?}", kind.tag(), widget.value()),
        },
    }
}
