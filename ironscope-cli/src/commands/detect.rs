//! `ironscope detect` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::info;

use ironscope_core::config::IronscopeConfig;
use ironscope_engine::{Analyzer, EngineConfig, FormatDecision, FormatReport};

use crate::cli::DetectArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `detect` command.
///
/// Only the sniff prefix of the file is read. A rejected format is still
/// rendered before the command fails with exit code 3.
pub async fn execute(
    args: DetectArgs,
    config: &IronscopeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let analyzer = Analyzer::new(EngineConfig::from_core(&config.engine))?;
    let sniff_bytes = analyzer.config().sniff_bytes;

    info!(file = %args.file.display(), sniff_bytes, "detecting format");

    let prefix = read_prefix(&args.file, sniff_bytes).await?;
    let decision = analyzer.detect_format(&prefix);
    let report = DetectionReport::new(&args.file, &decision);

    writer.render(&report)?;

    match decision {
        FormatDecision::Rejected(format) => Err(CliError::FormatRejected(format!(
            "unrecognized log format ({}, confidence {}%)",
            format.format.label(),
            format.confidence
        ))),
        _ => Ok(()),
    }
}

async fn read_prefix(path: &Path, limit: usize) -> Result<Vec<u8>, CliError> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        CliError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {e}", path.display()),
        ))
    })?;
    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Format detection output.
#[derive(Serialize)]
pub struct DetectionReport {
    pub file: String,
    /// `tabular`, `block` or `rejected`
    pub decision: &'static str,
    pub format: String,
    pub format_name: String,
    pub confidence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    pub headers: Vec<String>,
    pub missing: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_markers: Option<usize>,
}

impl DetectionReport {
    fn new(path: &Path, decision: &FormatDecision) -> Self {
        let file = path.display().to_string();
        let format = decision.format();
        match decision {
            FormatDecision::Tabular(report) => Self::from_tabular(file, "tabular", report),
            FormatDecision::Rejected(report) => Self::from_tabular(file, "rejected", report),
            FormatDecision::Block { markers } => Self {
                file,
                decision: "block",
                format: format.label().to_owned(),
                format_name: format.to_string(),
                confidence: None,
                delimiter: None,
                headers: Vec::new(),
                missing: Vec::new(),
                suggestions: Vec::new(),
                block_markers: Some(*markers),
            },
        }
    }

    fn from_tabular(file: String, decision: &'static str, report: &FormatReport) -> Self {
        Self {
            file,
            decision,
            format: report.format.label().to_owned(),
            format_name: report.format.to_string(),
            confidence: Some(report.confidence),
            delimiter: Some(describe_delimiter(report.delimiter)),
            headers: report.headers.clone(),
            missing: report.missing_labels(),
            suggestions: report.suggestions.clone(),
            block_markers: None,
        }
    }
}

fn describe_delimiter(delimiter: char) -> String {
    match delimiter {
        '\t' => "tab".to_owned(),
        ',' => "comma".to_owned(),
        ';' => "semicolon".to_owned(),
        '|' => "pipe".to_owned(),
        other => other.to_string(),
    }
}

impl Render for DetectionReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Format Detection: {}", self.file.bold())?;

        let status = match self.decision {
            "rejected" => "REJECTED".red().bold(),
            _ => "ACCEPTED".green().bold(),
        };
        writeln!(w, "  Result:     {status}")?;
        writeln!(w, "  Format:     {} ({})", self.format_name, self.format)?;

        if let Some(confidence) = self.confidence {
            writeln!(w, "  Confidence: {confidence}%")?;
        }
        if let Some(ref delimiter) = self.delimiter {
            writeln!(w, "  Delimiter:  {delimiter}")?;
        }
        if let Some(markers) = self.block_markers {
            writeln!(w, "  Markers:    {markers} of 5 block markers found")?;
        }
        if !self.headers.is_empty() {
            writeln!(w, "  Headers:    {}", self.headers.join(", "))?;
        }
        if !self.missing.is_empty() {
            writeln!(w, "  Missing:    {}", self.missing.join(", ").yellow())?;
        }
        for hint in &self.suggestions {
            writeln!(w, "  Hint:       {hint}")?;
        }

        Ok(())
    }
}
