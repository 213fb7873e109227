//! Local prediction against a model file

use anyhow::Result;
use risk_lib::predictor::{ModelSettings, GAUGE_LABEL};
use risk_lib::{ClassifierCache, InferenceAdapter, RiskReport};
use tabled::Tabled;
use tracing::debug;

use crate::output::{color_percentage, color_verdict, print_json, render_gauge, OutputFormat};
use crate::{RecordArgs, SchemaArgs};

/// Row for the report table
#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl ReportRow {
    fn new(field: &str, value: String) -> Self {
        Self {
            field: field.to_string(),
            value,
        }
    }
}

/// Print a risk report as a table or JSON
pub fn print_report(report: &RiskReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            let rows = vec![
                ReportRow::new(
                    "Verdict",
                    color_verdict(&report.message, report.is_high_risk()),
                ),
                ReportRow::new("Probability", format!("{:.4}", report.probability)),
                ReportRow::new("Risk", color_percentage(report.percentage)),
                ReportRow::new(GAUGE_LABEL, render_gauge(&report.gauge)),
                ReportRow::new("Model", report.model_version.clone()),
            ];

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}

/// Score a record with a model file on this machine
pub fn run_local(
    model: &ModelSettings,
    record_args: &RecordArgs,
    schema_args: &SchemaArgs,
    fill_defaults: bool,
    format: OutputFormat,
) -> Result<()> {
    let provider = schema_args.source().provider();
    let schema = provider.load_schema()?;

    let mut record = record_args.to_record()?;
    if fill_defaults {
        let defaults = provider.load_defaults(&schema)?;
        debug!(defaults = defaults.len(), "Filling missing fields from reference medians");
        record.fill_missing(&defaults);
    }

    let classifier = ClassifierCache::global().get_or_load(model)?;
    let adapter = InferenceAdapter::new(schema, classifier);

    let result = adapter.predict(&record)?;
    let report = RiskReport::new(&result, adapter.model_version());

    print_report(&report, format)
}
