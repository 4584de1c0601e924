//! `ironscope rules` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use ironscope_core::Severity;
use ironscope_engine::enrich;
use ironscope_engine::{DetectionRule, MitreTechnique, RuleSet};

use crate::cli::{RulesAction, RulesArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `rules` command.
pub async fn execute(args: RulesArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let rules = RuleSet::builtin()?;
    match args.action {
        RulesAction::List { severity, tactic } => {
            execute_list(&rules, severity.as_deref(), tactic.as_deref(), writer)
        }
        RulesAction::Show { id } => execute_show(&rules, &id, writer),
    }
}

fn execute_list(
    rules: &RuleSet,
    severity: Option<&str>,
    tactic: Option<&str>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = build_list(rules, severity, tactic)?;
    info!(total = report.total, "listing detection rules");
    writer.render(&report)
}

fn build_list(
    rules: &RuleSet,
    severity: Option<&str>,
    tactic: Option<&str>,
) -> Result<RuleListReport, CliError> {
    let severity = severity
        .map(|s| {
            Severity::from_str_loose(s).ok_or_else(|| {
                CliError::Command(format!(
                    "unknown severity: {s} (expected: high, medium, low)"
                ))
            })
        })
        .transpose()?;
    let tactic = tactic.map(normalize_tactic);

    let entries: Vec<RuleEntry> = rules
        .iter()
        .filter(|r| severity.is_none_or(|s| r.severity == s))
        .filter(|r| {
            tactic
                .as_deref()
                .is_none_or(|t| normalize_tactic(&r.tactic) == t)
        })
        .map(RuleEntry::from)
        .collect();

    Ok(RuleListReport {
        total: entries.len(),
        rules: entries,
    })
}

fn execute_show(rules: &RuleSet, id: &str, writer: &OutputWriter) -> Result<(), CliError> {
    let rule = rules
        .get(id)
        .ok_or_else(|| CliError::Command(format!("unknown rule id: {id}")))?;
    writer.render(&RuleDetail::from(rule))
}

/// `"Defense Evasion"`, `"defense_evasion"` and `"defense-evasion"` compare equal.
fn normalize_tactic(tactic: &str) -> String {
    tactic
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect()
}

#[derive(Serialize)]
pub struct RuleListReport {
    pub total: usize,
    pub rules: Vec<RuleEntry>,
}

#[derive(Serialize)]
pub struct RuleEntry {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub technique: String,
    pub tactic: String,
    pub confidence: u8,
    pub clauses: usize,
}

impl From<&DetectionRule> for RuleEntry {
    fn from(rule: &DetectionRule) -> Self {
        Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            severity: rule.severity,
            technique: rule.technique.clone(),
            tactic: rule.tactic.clone(),
            confidence: rule.confidence,
            clauses: rule.clauses.len(),
        }
    }
}

fn colored_severity(severity: Severity) -> colored::ColoredString {
    use colored::Colorize;

    let label = severity.as_str();
    match severity {
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.normal(),
    }
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Detection Rules ({} total)",
            self.total.to_string().bold()
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<26} {:<8} {:<11} {:<22} Name",
            "ID", "Severity", "Technique", "Tactic"
        )?;
        writeln!(w, "{}", "-".repeat(100))?;

        for r in &self.rules {
            writeln!(
                w,
                "{:<26} {:<8} {:<11} {:<22} {}",
                r.id,
                colored_severity(r.severity),
                r.technique,
                r.tactic,
                r.name
            )?;
        }

        Ok(())
    }
}

/// Full rule description with its MITRE ATT&CK metadata.
#[derive(Serialize)]
pub struct RuleDetail {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub technique: String,
    pub tactic: String,
    pub description: String,
    pub confidence: u8,
    pub clauses: Vec<ClauseEntry>,
    pub mitre: Option<MitreTechnique>,
}

#[derive(Serialize)]
pub struct ClauseEntry {
    pub field: String,
    pub kind: String,
    pub pattern: String,
    pub indicator: String,
}

impl From<&DetectionRule> for RuleDetail {
    fn from(rule: &DetectionRule) -> Self {
        let clauses = rule
            .clauses
            .iter()
            .zip(&rule.indicators)
            .map(|(clause, indicator)| ClauseEntry {
                field: clause.field.clone(),
                kind: format!("{:?}", clause.pattern.kind()).to_lowercase(),
                pattern: clause.pattern.as_str().to_owned(),
                indicator: indicator.clone(),
            })
            .collect();

        Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            severity: rule.severity,
            technique: rule.technique.clone(),
            tactic: rule.tactic.clone(),
            description: rule.description.clone(),
            confidence: rule.confidence,
            clauses,
            mitre: enrich::lookup(&rule.technique).cloned(),
        }
    }
}

impl Render for RuleDetail {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{} ({})", self.name.bold(), self.id)?;
        writeln!(w, "  Severity:   {}", colored_severity(self.severity))?;
        writeln!(w, "  Technique:  {}", self.technique)?;
        writeln!(w, "  Tactic:     {}", self.tactic)?;
        writeln!(w, "  Confidence: {}%", self.confidence)?;
        writeln!(w, "  {}", self.description)?;

        writeln!(w)?;
        writeln!(w, "Clauses (any match fires the rule)")?;
        for clause in &self.clauses {
            writeln!(
                w,
                "  {:<18} {:<9} {}  [{}]",
                clause.field, clause.kind, clause.pattern, clause.indicator
            )?;
        }

        writeln!(w)?;
        match self.mitre {
            Some(ref mitre) => {
                writeln!(w, "MITRE ATT&CK {}: {}", mitre.id, mitre.name.bold())?;
                writeln!(w, "  Tactics:      {}", mitre.tactics.join(", "))?;
                writeln!(w, "  Platforms:    {}", mitre.platforms.join(", "))?;
                writeln!(w, "  Data sources: {}", mitre.data_sources.join(", "))?;
                writeln!(w, "  {}", mitre.url)?;
            }
            None => writeln!(w, "MITRE ATT&CK: no metadata for {}", self.technique)?,
        }

        Ok(())
    }
}
