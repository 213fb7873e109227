//! Remote prediction through the HTTP service

use anyhow::Result;

use super::predict::print_report;
use crate::client::ApiClient;
use crate::output::{print_info, print_success, OutputFormat};
use crate::RecordArgs;

/// Send a record to the service and print the returned report
pub async fn submit_record(
    client: &ApiClient,
    record_args: &RecordArgs,
    format: OutputFormat,
) -> Result<()> {
    let record = record_args.to_record()?;
    if let OutputFormat::Table = format {
        print_info(&format!("Submitting record with {} fields", record.len()));
    }

    let report = client.predict(&record).await?;

    if let OutputFormat::Table = format {
        print_success("Prediction received");
    }
    print_report(&report, format)
}
