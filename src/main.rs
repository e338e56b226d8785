use form_client::{FhirClient, TracingBusyIndicator};
use form_core::{
    adapt_rows, assemble, extract_field_schemas, profile_to_adapt, render_rows, FormConfig,
    FormInputs, RowRegistry,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Runs one form session against a DSF FHIR server.
///
/// Fetches the resource behind the page, renders its rows, adapts them to the Task profile when
/// one is declared, applies the user's inputs, validates and submits.
///
/// # Environment Variables
/// - `FORMS_PAGE_URL`: address of the Task or QuestionnaireResponse page (required)
/// - `FORMS_INPUTS_FILE`: JSON file mapping row keys to widget values (optional)
/// - `FORMS_REQUEST_TIMEOUT_SECS`: request timeout (default: 30)
/// - `FORMS_REDIRECT_DELAY_MS`: pause after a successful submission (default: 1000)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("form=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = FormConfig::from_env_values(
        std::env::var("FORMS_PAGE_URL").ok(),
        std::env::var("FORMS_REQUEST_TIMEOUT_SECS").ok(),
        std::env::var("FORMS_REDIRECT_DELAY_MS").ok(),
    )?;
    let client = FhirClient::new(&config)?;

    let resource = client.fetch_resource().await?;
    let mut registry = render_rows(&resource);
    tracing::info!(
        resource_type = resource.resource_type(),
        rows = registry.len(),
        "form rendered"
    );

    if let Some(profile) = profile_to_adapt(&resource) {
        adapt_to_profile(&client, profile, &mut registry).await;
    }

    if let Ok(path) = std::env::var("FORMS_INPUTS_FILE") {
        let text = std::fs::read_to_string(&path)?;
        let applied = FormInputs::parse(&text)?.apply(&mut registry)?;
        tracing::info!(applied, path, "inputs applied");
    }

    let Some(submission) = assemble(&resource, &mut registry, chrono::Utc::now()) else {
        for row in registry.rows() {
            for message in row.errors().messages() {
                eprintln!("{}: {message}", row.key());
            }
        }
        anyhow::bail!("form has {} error(s)", registry.error_count());
    };

    let navigation = client.submit(&submission, &TracingBusyIndicator).await?;
    println!("{}", navigation.target);

    Ok(())
}

/// Rows keep their rendered shape if the profile cannot be loaded.
async fn adapt_to_profile(client: &FhirClient, profile: &str, registry: &mut RowRegistry) {
    match client.search_structure_definition(profile).await {
        Ok(bundle) => {
            let adapted = adapt_rows(registry, &extract_field_schemas(&bundle));
            tracing::info!(profile, adapted, "rows adapted to profile");
        }
        Err(e) => tracing::warn!(profile, error = %e, "profile lookup failed"),
    }
}
