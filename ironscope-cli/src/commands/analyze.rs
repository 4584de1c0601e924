//! `ironscope analyze` command handler

use std::io::Write;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

use ironscope_core::config::IronscopeConfig;
use ironscope_engine::progress::{self, AnalysisStage, Progress, ProgressSender};
use ironscope_engine::report::write_report;
use ironscope_engine::{AnalysisOptions, AnalysisResult, Analyzer, EngineConfig};

use crate::cli::AnalyzeArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `analyze` command.
///
/// The engine is synchronous, so the analysis runs on the blocking pool while
/// this task drains progress updates to stderr.
pub async fn execute(
    args: AnalyzeArgs,
    config: &IronscopeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let analyzer = Analyzer::new(EngineConfig::from_core(&config.engine))?;

    let (sender, receiver) = if args.no_progress {
        (ProgressSender::disabled(), None)
    } else {
        let (tx, rx) = progress::channel(analyzer.config().progress_capacity);
        (tx, Some(rx))
    };

    let options = AnalysisOptions {
        progress: sender,
        row_budget: args.row_budget,
        strict: args.strict.then_some(true),
        skip_invalid_silently: args.skip_invalid.then_some(true),
    };

    info!(file = %args.file.display(), "starting analysis");

    let path = args.file.clone();
    let task = tokio::task::spawn_blocking(move || analyzer.analyze_path(&path, &options));
    let drain = receiver.map(|rx| tokio::spawn(drain_progress(rx)));

    let outcome = task
        .await
        .map_err(|e| CliError::Command(format!("analysis task failed: {e}")))?;

    // The sender lives in `options`, which is dropped with the blocking task,
    // so the drain loop ends once the analysis returns.
    if let Some(handle) = drain {
        if let Err(e) = handle.await {
            warn!(error = %e, "progress task failed");
        }
    }

    let result = outcome?;
    writer.render(&AnalysisReport { result })?;
    Ok(())
}

/// Print progress updates on a single stderr line until the channel closes.
async fn drain_progress(rx: mpsc::Receiver<Progress>) {
    if let Err(e) = write_progress(rx, std::io::stderr()).await {
        trace!(error = %e, "progress line could not be written");
    }
}

/// Write every distinct update to `out`, returning the first write error.
///
/// The channel is drained to the end even after a failed write.
async fn write_progress<W: Write>(
    mut rx: mpsc::Receiver<Progress>,
    mut out: W,
) -> std::io::Result<()> {
    use colored::Colorize;

    let mut last: Option<Progress> = None;
    let mut first_error: Option<std::io::Error> = None;

    while let Some(update) = rx.recv().await {
        if last == Some(update) {
            continue;
        }
        last = Some(update);
        if first_error.is_some() {
            continue;
        }
        let marker = match update.stage {
            AnalysisStage::Done => "done".green(),
            AnalysisStage::Failed => "failed".red(),
            _ => "....".cyan(),
        };
        let written =
            write!(out, "\r{marker} {:<28}", update.to_string()).and_then(|()| out.flush());
        if let Err(e) = written {
            first_error = Some(e);
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if last.is_some() {
        writeln!(out)?;
    }
    Ok(())
}

/// Analysis output payload.
///
/// Serialises exactly as [`AnalysisResult`].
#[derive(Serialize)]
#[serde(transparent)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
}

impl Render for AnalysisReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        write_report(w, &self.result)?;
        writeln!(w)?;

        let verdict = match self.result.top_detection() {
            Some(top) => {
                let label = format!(
                    "{} detection(s), highest severity {}",
                    self.result.detections.len(),
                    top.severity.as_str().to_uppercase()
                );
                match top.severity {
                    ironscope_core::Severity::High => label.red().bold(),
                    ironscope_core::Severity::Medium => label.yellow().bold(),
                    ironscope_core::Severity::Low => label.normal(),
                }
            }
            None => "no threats detected".green().bold(),
        };
        writeln!(w, "Verdict: {verdict}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(input: &str) -> AnalysisResult {
        Analyzer::new(EngineConfig::default())
            .expect("default engine should build")
            .analyze_bytes("input.csv", input.as_bytes(), &AnalysisOptions::default())
            .expect("analysis should succeed")
    }

    fn render_text(report: &AnalysisReport) -> String {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_analysis_report_text_includes_verdict() {
        let report = AnalysisReport {
            result: analyze(
                "UtcTime,EventID,Computer,Image,CommandLine\n\
                 t1,1,WS01,C:\\x\\powershell.exe,powershell Invoke-Mimikatz\n",
            ),
        };
        let text = render_text(&report);
        assert!(text.contains("Credential Dumping"));
        assert!(text.contains("Verdict: 1 detection(s), highest severity HIGH"));
    }

    #[test]
    fn test_analysis_report_clean_verdict() {
        let report = AnalysisReport {
            result: analyze("UtcTime,EventID,Image,CommandLine\nt1,1,notepad.exe,notepad.exe\n"),
        };
        let text = render_text(&report);
        assert!(text.contains("No detections."));
        assert!(text.contains("Verdict: no threats detected"));
    }

    #[test]
    fn test_analysis_report_json_is_flat_result() {
        let report = AnalysisReport {
            result: analyze("UtcTime,EventID,Image,CommandLine\nt1,1,notepad.exe,notepad.exe\n"),
        };
        let json = serde_json::to_value(&report).expect("json serialization should succeed");
        assert_eq!(json["file_name"].as_str(), Some("input.csv"));
        assert_eq!(json["valid_events"].as_u64(), Some(1));
        assert!(json.get("result").is_none(), "payload should not be nested");
    }

    #[tokio::test]
    async fn test_drain_progress_ends_when_sender_dropped() {
        let (sender, rx) = progress::channel(8);
        sender.report(AnalysisStage::Parsing, 50);
        sender.report(AnalysisStage::Done, 100);
        drop(sender);
        drain_progress(rx).await;
    }

    #[tokio::test]
    async fn test_write_progress_prints_each_distinct_update() {
        let (sender, rx) = progress::channel(8);
        sender.report(AnalysisStage::Parsing, 50);
        sender.report(AnalysisStage::Parsing, 50);
        sender.report(AnalysisStage::Done, 100);
        drop(sender);

        let mut out = Vec::new();
        write_progress(rx, &mut out).await.expect("writing to memory succeeds");
        let text = String::from_utf8(out).expect("progress output is utf-8");
        assert_eq!(text.matches("Parsing").count(), 1);
        assert!(text.contains("Done (100%)"));
        assert!(text.ends_with('\n'));
    }

    struct BrokenPipe {
        attempts: usize,
    }

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.attempts += 1;
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_write_progress_reports_failure_and_drains_channel() {
        let (sender, rx) = progress::channel(8);
        sender.report(AnalysisStage::Parsing, 10);
        sender.report(AnalysisStage::Parsing, 60);
        sender.report(AnalysisStage::Done, 100);
        drop(sender);

        let mut out = BrokenPipe { attempts: 0 };
        let err = write_progress(rx, &mut out)
            .await
            .expect_err("a broken stderr must surface as an error");
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
        assert_eq!(out.attempts, 1, "writing stops after the first failure");
    }
}
