//! Feature schema inspection

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, SchemaField, SchemaResponse};
use crate::output::{print_json, print_warning, OutputFormat};
use crate::SchemaArgs;

/// Row for the schema table
#[derive(Tabled)]
struct SchemaRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Accepts")]
    domain: String,
    #[tabled(rename = "Default")]
    default: String,
}

fn print_schema(schema: &SchemaResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(schema)?,
        OutputFormat::Table => {
            let rows: Vec<SchemaRow> = schema
                .fields
                .iter()
                .enumerate()
                .map(|(idx, field)| SchemaRow {
                    position: idx + 1,
                    name: field.name.clone(),
                    label: field.label.clone(),
                    domain: field.domain.to_string(),
                    default: field
                        .default
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if let Some(version) = &schema.model_version {
                println!("\nModel: {}", version);
            }
        }
    }

    Ok(())
}

/// Show the schema derived from the fixed list or a reference dataset
pub fn show_local(args: &SchemaArgs, format: OutputFormat) -> Result<()> {
    let provider = args.source().provider();
    let schema = provider.load_schema()?;

    let defaults = match provider.load_defaults(&schema) {
        Ok(defaults) => defaults,
        Err(e) => {
            print_warning(&format!("No defaults: {}", e));
            Default::default()
        }
    };

    let fields = schema
        .fields()
        .iter()
        .map(|spec| SchemaField {
            name: spec.name.clone(),
            label: spec.label.clone(),
            domain: spec.domain.clone(),
            default: defaults.get(&spec.name).copied(),
        })
        .collect();

    print_schema(
        &SchemaResponse {
            fields,
            model_version: None,
        },
        format,
    )
}

/// Show the schema the prediction service is running with
pub async fn show_remote(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let schema = client.schema().await?;
    print_schema(&schema, format)
}
