//! 텍스트 보고서 렌더링
//!
//! [`AnalysisResult`]의 각 필드를 사람이 읽을 수 있는 평문으로 출력합니다.

use std::io::{self, Write};

use ironscope_core::types::Severity;

use crate::enrich::MitreTechnique;
use crate::result::AnalysisResult;
use crate::rule::Detection;

/// 분석 결과를 텍스트 보고서로 씁니다.
///
/// JSON으로 직렬화되는 모든 필드가 한 번씩 나타납니다.
pub fn write_report(w: &mut dyn Write, result: &AnalysisResult) -> io::Result<()> {
    writeln!(w, "Analysis of {}", result.file_name)?;
    writeln!(w, "  Format:          {} ({})", result.format, result.format.label())?;
    writeln!(w, "  Analyzed at:     {}", result.analyzed_at.to_rfc3339())?;
    writeln!(w, "  Elapsed:         {} ms", result.elapsed_ms)?;
    writeln!(
        w,
        "  Records:         {} total, {} valid, {} invalid",
        result.total_events, result.valid_events, result.invalid_events
    )?;
    if result.truncated {
        writeln!(
            w,
            "  Truncated:       yes (row budget reached, remaining input was not analyzed)"
        )?;
    } else {
        writeln!(w, "  Truncated:       no")?;
    }
    writeln!(
        w,
        "  Time range:      {} .. {}",
        result.first_timestamp.as_deref().unwrap_or("-"),
        result.last_timestamp.as_deref().unwrap_or("-")
    )?;
    writeln!(
        w,
        "  Categories:      {} network, {} file, {} registry",
        result.network_events, result.file_events, result.registry_events
    )?;

    let h = &result.event_types;
    writeln!(w)?;
    writeln!(w, "Event types")?;
    writeln!(w, "  process-create:  {}", h.process_create)?;
    writeln!(w, "  network-connect: {}", h.network_connect)?;
    writeln!(w, "  file-create:     {}", h.file_create)?;
    writeln!(w, "  registry:        {}", h.registry)?;
    writeln!(w, "  dns-query:       {}", h.dns_query)?;
    writeln!(w, "  other:           {}", h.other)?;

    let totals = &result.severity_totals;
    writeln!(w)?;
    writeln!(
        w,
        "Severity totals: {} high, {} medium, {} low",
        totals.get(Severity::High),
        totals.get(Severity::Medium),
        totals.get(Severity::Low)
    )?;

    writeln!(w)?;
    writeln!(w, "Top tactics")?;
    if result.top_tactics.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for tactic in &result.top_tactics {
        writeln!(w, "  {:<22} {}", tactic.tactic, tactic.count)?;
    }

    writeln!(w)?;
    if result.has_detections() {
        writeln!(w, "Detections ({})", result.detections.len())?;
        for detection in &result.detections {
            write_detection(w, detection)?;
        }
    } else {
        writeln!(w, "No detections.")?;
    }

    writeln!(w)?;
    if result.parse_errors.is_empty() {
        writeln!(w, "Parse errors: none")?;
    } else {
        writeln!(w, "Parse errors ({})", result.parse_errors.len())?;
        for error in &result.parse_errors {
            writeln!(w, "  {error}")?;
        }
    }
    Ok(())
}

fn write_detection(w: &mut dyn Write, detection: &Detection) -> io::Result<()> {
    writeln!(
        w,
        "  [{}] {} ({}) -- {} event(s)",
        detection.severity.as_str().to_uppercase(),
        detection.name,
        detection.rule_id,
        detection.count
    )?;
    writeln!(w, "      description: {}", detection.description)?;
    writeln!(
        w,
        "      technique: {}  tactic: {}  confidence: {}%",
        detection.technique, detection.tactic, detection.confidence
    )?;
    writeln!(w, "      indicators: {}", join_or_dash(&detection.indicators))?;
    if let Some(mitre) = &detection.mitre {
        write_mitre(w, mitre)?;
    }
    writeln!(w, "      samples ({}):", detection.samples.len())?;
    for sample in &detection.samples {
        writeln!(w, "        {sample}")?;
    }
    Ok(())
}

fn write_mitre(w: &mut dyn Write, mitre: &MitreTechnique) -> io::Result<()> {
    writeln!(w, "      mitre: {} {} <{}>", mitre.id, mitre.name, mitre.url)?;
    writeln!(w, "        tactics:      {}", join_or_dash(&mitre.tactics))?;
    writeln!(w, "        platforms:    {}", join_or_dash(&mitre.platforms))?;
    writeln!(w, "        data sources: {}", join_or_dash(&mitre.data_sources))?;
    writeln!(w, "        {}", mitre.description)?;
    Ok(())
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_owned()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalysisOptions, Analyzer};
    use crate::config::EngineConfig;

    const MIXED_INPUT: &str = "UtcTime,EventID,Computer,Image,CommandLine\n\
        t1,1,WS01,C:\\x\\vssadmin.exe,vssadmin delete shadows /all\n\
        t2,x,WS01,C:\\x\\a.exe,a.exe\n";

    fn analyze(input: &str) -> AnalysisResult {
        Analyzer::new(EngineConfig::default())
            .unwrap()
            .analyze_bytes("input.csv", input.as_bytes(), &AnalysisOptions::default())
            .unwrap()
    }

    fn render(input: &str) -> String {
        let result = analyze(input);
        let mut out = Vec::new();
        write_report(&mut out, &result).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// 결과 필드별 보고서 표식
    fn result_label(key: &str) -> &'static str {
        match key {
            "file_name" => "Analysis of",
            "format" => "Format:",
            "total_events" | "valid_events" | "invalid_events" => "Records:",
            "parse_errors" => "Parse errors",
            "truncated" => "Truncated:",
            "analyzed_at" => "Analyzed at:",
            "elapsed_ms" => "Elapsed:",
            "first_timestamp" | "last_timestamp" => "Time range:",
            "network_events" | "file_events" | "registry_events" => "Categories:",
            "detections" => "Detections (",
            "severity_totals" => "Severity totals:",
            "top_tactics" => "Top tactics",
            "event_types" => "Event types",
            other => panic!("result field '{other}' has no report line"),
        }
    }

    /// JSON 값이 보고서에 그대로 나타나는지 확인합니다.
    fn assert_value_rendered(text: &str, key: &str, value: &serde_json::Value) {
        match value {
            serde_json::Value::String(s) if key == "severity" => {
                assert!(text.contains(&s.to_uppercase()), "{key}: {s}");
            }
            serde_json::Value::String(s) => assert!(text.contains(s.as_str()), "{key}: {s}"),
            serde_json::Value::Number(n) => {
                assert!(text.contains(&n.to_string()), "{key}: {n}");
            }
            serde_json::Value::Array(items) if key == "samples" => {
                assert!(text.contains(&format!("samples ({}):", items.len())));
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    assert_value_rendered(text, key, item);
                }
            }
            serde_json::Value::Object(fields) => {
                for (inner, v) in fields {
                    assert_value_rendered(text, inner, v);
                }
            }
            serde_json::Value::Bool(_) | serde_json::Value::Null => {}
        }
    }

    #[test]
    fn every_json_field_appears_in_report() {
        let result = analyze(MIXED_INPUT);
        let mut out = Vec::new();
        write_report(&mut out, &result).unwrap();
        let text = String::from_utf8(out).unwrap();

        let json = serde_json::to_value(&result).unwrap();
        for key in json.as_object().unwrap().keys() {
            assert!(text.contains(result_label(key)), "missing line for {key}");
        }

        let detection = &json["detections"][0];
        assert!(detection["mitre"].is_object());
        for (key, value) in detection.as_object().unwrap() {
            assert_value_rendered(&text, key, value);
        }
        for error in &result.parse_errors {
            assert!(text.contains(error.as_str()));
        }
    }

    #[test]
    fn every_parse_error_and_sample_is_printed() {
        let mut input = String::from("UtcTime,EventID,Image,CommandLine\n");
        for i in 0..3 {
            input.push_str(&format!("t{i},1,C:\\x\\vssadmin.exe,vssadmin delete shadows /all\n"));
        }
        for _ in 0..25 {
            input.push_str("t,x,a.exe,a.exe\n");
        }
        let text = render(&input);
        assert!(text.contains("Parse errors (25)"));
        assert!(text.contains("Row 29: missing or non-numeric event id"));
        assert!(text.contains("samples (3):"));
        assert_eq!(text.matches("vssadmin delete shadows /all").count(), 3);
    }

    #[test]
    fn report_lists_detections_with_mitre() {
        let text = render(
            "UtcTime,EventID,Computer,Image,CommandLine\n\
             t1,1,WS01,C:\\x\\vssadmin.exe,vssadmin delete shadows /all\n",
        );
        assert!(text.contains("Analysis of input.csv"));
        assert!(text.contains("[HIGH] Shadow Copy Deletion (shadow_copy_deletion)"));
        assert!(text.contains("mitre: T1490 Inhibit System Recovery"));
        assert!(text.contains("indicators: vssadmin_delete"));
        assert!(text.contains("Severity totals: 1 high, 0 medium, 0 low"));
    }

    #[test]
    fn report_without_detections_and_with_errors() {
        let text = render("EventID,UtcTime,Image\n1,t,notepad.exe\nx,t,a.exe\n");
        assert!(text.contains("No detections."));
        assert!(text.contains("Parse errors (1)"));
        assert!(text.contains("Row 3: missing or non-numeric event id"));
    }
}
