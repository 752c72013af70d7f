//! Extract command - run a layout's rules over one fragment file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use fieldmap_core::rules::{ExtractionOutcome, RuleEngine};

use super::{load_config, load_fragments, load_layout};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Fragment file (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Layout map with the field rules
    #[arg(short, long)]
    layout: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show matched/unmatched statistics
    #[arg(long)]
    show_stats: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    /// File extension for written outputs.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);

    pb.set_message("Loading fragments...");
    let fragments = load_fragments(&args.input)?;
    let layout = load_layout(&args.layout)?;

    info!(
        "Extracting {} fields from {} ({} fragments)",
        layout.fields.len(),
        args.input.display(),
        fragments.len()
    );

    pb.set_message("Evaluating rules...");
    let engine = RuleEngine::with_config(config.extraction);
    let outcome = engine.extract_layout(&layout, &fragments);
    pb.finish_and_clear();

    let output = format_outcome(&outcome, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_stats {
        eprintln!();
        eprintln!(
            "{} Matched {} of {} fields",
            style("ℹ").blue(),
            outcome.extractions.len(),
            layout.fields.len()
        );
        if !outcome.errors.is_empty() {
            eprintln!("{}", style("Rule errors:").yellow());
            for issue in &outcome.errors {
                eprintln!("  - {} ({}): {}", issue.field_id, issue.rule_id, issue.message);
            }
        }
        eprintln!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            outcome.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_outcome(outcome: &ExtractionOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => format_csv(outcome),
        OutputFormat::Text => Ok(format_text(outcome)),
    }
}

fn format_csv(outcome: &ExtractionOutcome) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["field_id", "value", "rule_id", "source_fragment_ids"])?;

    for extraction in &outcome.extractions {
        let source_ids = extraction.source_fragment_ids().join(";");
        wtr.write_record([
            extraction.field_id.as_str(),
            extraction.value.as_str(),
            extraction.rule_id.as_str(),
            source_ids.as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(outcome: &ExtractionOutcome) -> String {
    let mut output = String::new();

    output.push_str("Fields:\n");
    for extraction in &outcome.extractions {
        let value = extraction.value.replace('\n', " / ");
        output.push_str(&format!("  {}: {}\n", extraction.field_id, value));
    }

    if !outcome.unmatched_field_ids.is_empty() {
        output.push_str("\nUnmatched:\n");
        for field_id in &outcome.unmatched_field_ids {
            output.push_str(&format!("  {}\n", field_id));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmap_core::rules::{FieldExtraction, TextSegment};
    use pretty_assertions::assert_eq;

    fn outcome() -> ExtractionOutcome {
        ExtractionOutcome {
            extractions: vec![FieldExtraction {
                field_id: "document_number".to_string(),
                value: "INV-123".to_string(),
                segments: vec![TextSegment {
                    text: "INV-123".to_string(),
                    source_fragment_ids: vec!["f1".to_string(), "f2".to_string()],
                }],
                rule_id: "number".to_string(),
            }],
            unmatched_field_ids: vec!["due_date".to_string()],
            ..ExtractionOutcome::default()
        }
    }

    #[test]
    fn test_csv_output() {
        let csv = format_outcome(&outcome(), OutputFormat::Csv).unwrap();
        assert_eq!(
            csv,
            "field_id,value,rule_id,source_fragment_ids\ndocument_number,INV-123,number,f1;f2\n"
        );
    }

    #[test]
    fn test_text_output() {
        let text = format_outcome(&outcome(), OutputFormat::Text).unwrap();
        assert_eq!(
            text,
            "Fields:\n  document_number: INV-123\n\nUnmatched:\n  due_date\n"
        );
    }
}
