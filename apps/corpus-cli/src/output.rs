//! Human-readable and JSON rendering of command results
//!
//! Everything here returns a `String`; the commands decide where it goes.

use anyhow::Result;
use std::fmt::Write;

use corpus_core::ingest::BatchReport;
use corpus_core::{IngestSummary, LoadSummary, RankedResult};

/// One line per hit, best first
pub fn format_results(results: &[RankedResult]) -> Result<String> {
    let mut output = String::new();

    if results.is_empty() {
        writeln!(output, "No results.")?;
        return Ok(output);
    }

    for hit in results {
        writeln!(
            output,
            "ID {} | Score: {:.4} | Title: {}",
            hit.id, hit.score, hit.label
        )?;
    }

    Ok(output)
}

pub fn format_results_json(results: &[RankedResult]) -> Result<String> {
    let mut output = serde_json::to_string_pretty(results)?;
    output.push('\n');
    Ok(output)
}

pub fn format_ingest_summary(summary: &IngestSummary) -> Result<String> {
    let mut output = String::new();

    writeln!(output, "Ingestion summary")?;
    writeln!(output, "  Rows embedded:    {}", summary.rows_embedded)?;
    writeln!(output, "  Rows failed:      {}", summary.rows_failed())?;
    format_batches(&mut output, &summary.batches)?;

    if !summary.row_failures.is_empty() {
        writeln!(output)?;
        writeln!(output, "Failed rows:")?;
        for failure in &summary.row_failures {
            writeln!(output, "  • id {}: {}", failure.id, failure.reason)?;
        }
    }
    format_batch_failures(&mut output, &summary.batches)?;

    Ok(output)
}

pub fn format_load_summary(summary: &LoadSummary) -> Result<String> {
    let mut output = String::new();

    writeln!(output, "Load summary")?;
    writeln!(output, "  Records read:     {}", summary.records_read)?;
    format_batches(&mut output, &summary.batches)?;
    format_batch_failures(&mut output, &summary.batches)?;

    Ok(output)
}

fn format_batches(output: &mut String, report: &BatchReport) -> Result<()> {
    writeln!(output, "  Batches written:  {}", report.batches_written)?;
    writeln!(output, "  Items written:    {}", report.items_written)?;
    writeln!(output, "  Batches failed:   {}", report.batches_failed())?;
    Ok(())
}

fn format_batch_failures(output: &mut String, report: &BatchReport) -> Result<()> {
    if report.failures.is_empty() {
        return Ok(());
    }

    writeln!(output)?;
    writeln!(output, "Failed batches:")?;
    for failure in &report.failures {
        writeln!(
            output,
            "  • batch {} ({} items): {}",
            failure.batch, failure.size, failure.reason
        )?;
    }
    Ok(())
}
