//! 탐지 규칙 데이터 타입
//!
//! 규칙은 정적 정의 테이블([`RuleDef`])에서 한 번 컴파일되어
//! 불변 [`DetectionRule`]이 됩니다.

use std::borrow::Cow;

use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use ironscope_core::event::Event;
use ironscope_core::types::Severity;

use crate::error::AnalysisError;

/// 규칙 ID 최대 길이
const MAX_RULE_ID_LEN: usize = 128;

/// 패턴 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// 정규식 (`is_match`)
    Regex,
    /// 부분 문자열 포함 (대소문자 구분)
    Substring,
}

/// 조건 패턴 -- 정규식 또는 리터럴 부분 문자열
#[derive(Debug, Clone)]
pub enum ClausePattern {
    Regex(Regex),
    Substring(String),
}

impl ClausePattern {
    /// 필드 값이 패턴을 만족하는지 검사합니다.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(value),
            Self::Substring(needle) => value.contains(needle.as_str()),
        }
    }

    /// 원본 패턴 문자열
    pub fn as_str(&self) -> &str {
        match self {
            Self::Regex(re) => re.as_str(),
            Self::Substring(needle) => needle,
        }
    }

    /// 패턴 종류
    pub fn kind(&self) -> PatternKind {
        match self {
            Self::Regex(_) => PatternKind::Regex,
            Self::Substring(_) => PatternKind::Substring,
        }
    }
}

impl Serialize for ClausePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ClausePattern", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("pattern", self.as_str())?;
        state.end()
    }
}

/// 필드 조건 하나
#[derive(Debug, Clone, Serialize)]
pub struct Clause {
    /// 대상 필드 이름 (정규 이름 또는 `extra` 키)
    pub field: String,
    /// 매칭 패턴
    pub pattern: ClausePattern,
}

impl Clause {
    /// 새 조건을 생성합니다.
    pub fn new(field: impl Into<String>, pattern: ClausePattern) -> Self {
        Self {
            field: field.into(),
            pattern,
        }
    }

    /// 이벤트에서 대상 필드 값을 찾습니다.
    ///
    /// 정규 필드가 비어 있으면 같은 이름의 `extra` 값을 사용합니다.
    pub fn value<'e>(&self, event: &'e Event) -> Option<Cow<'e, str>> {
        event.field(&self.field)
    }

    /// 필드가 존재하고 패턴을 만족하면 `true`
    pub fn matches(&self, event: &Event) -> bool {
        self.value(event)
            .is_some_and(|value| self.pattern.matches(&value))
    }
}

/// 탐지 규칙
///
/// `clauses`와 `indicators`는 인덱스로 대응합니다.
/// 조건 중 하나라도 만족하면 이벤트가 규칙에 매칭됩니다 (OR 결합).
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRule {
    /// 규칙 고유 ID
    pub id: String,
    /// 규칙 이름
    pub name: String,
    /// MITRE ATT&CK 기법 ID (예: `T1003.001`)
    pub technique: String,
    /// MITRE ATT&CK 전술
    pub tactic: String,
    /// 심각도
    pub severity: Severity,
    /// 설명
    pub description: String,
    /// 조건 목록 (OR 결합)
    pub clauses: Vec<Clause>,
    /// 조건별 지표 이름
    pub indicators: Vec<String>,
    /// 신뢰도 (0-100)
    pub confidence: u8,
}

impl DetectionRule {
    /// 규칙의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.id.is_empty() {
            return Err(AnalysisError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > MAX_RULE_ID_LEN {
            return Err(AnalysisError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("rule id must not exceed {MAX_RULE_ID_LEN} characters"),
            });
        }

        if self.clauses.is_empty() {
            return Err(AnalysisError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule must have at least one clause".to_owned(),
            });
        }

        if self.clauses.len() != self.indicators.len() {
            return Err(AnalysisError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!(
                    "{} clauses but {} indicators",
                    self.clauses.len(),
                    self.indicators.len()
                ),
            });
        }

        if self.confidence > 100 {
            return Err(AnalysisError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("confidence {} exceeds 100", self.confidence),
            });
        }

        Ok(())
    }
}

/// 정적 조건 정의
#[derive(Debug, Clone, Copy)]
pub struct ClauseDef {
    pub field: &'static str,
    pub kind: PatternKind,
    pub pattern: &'static str,
    pub indicator: &'static str,
}

impl ClauseDef {
    /// 정규식 조건
    pub const fn regex(field: &'static str, pattern: &'static str, indicator: &'static str) -> Self {
        Self {
            field,
            kind: PatternKind::Regex,
            pattern,
            indicator,
        }
    }

    /// 부분 문자열 조건
    pub const fn substring(
        field: &'static str,
        pattern: &'static str,
        indicator: &'static str,
    ) -> Self {
        Self {
            field,
            kind: PatternKind::Substring,
            pattern,
            indicator,
        }
    }
}

/// 정적 규칙 정의
#[derive(Debug, Clone, Copy)]
pub struct RuleDef {
    pub id: &'static str,
    pub name: &'static str,
    pub technique: &'static str,
    pub tactic: &'static str,
    pub severity: Severity,
    pub description: &'static str,
    pub confidence: u8,
    pub clauses: &'static [ClauseDef],
}

impl RuleDef {
    /// 정의를 컴파일하고 검증합니다.
    ///
    /// 잘못된 정규식은 `AnalysisError::RuleValidation`으로 반환됩니다.
    pub fn compile(&self) -> Result<DetectionRule, AnalysisError> {
        let mut clauses = Vec::with_capacity(self.clauses.len());
        let mut indicators = Vec::with_capacity(self.clauses.len());

        for (idx, def) in self.clauses.iter().enumerate() {
            let pattern = match def.kind {
                PatternKind::Regex => {
                    let re = Regex::new(def.pattern).map_err(|e| AnalysisError::RuleValidation {
                        rule_id: self.id.to_owned(),
                        reason: format!(
                            "invalid regex in clause[{idx}] for field '{}': {e}",
                            def.field
                        ),
                    })?;
                    ClausePattern::Regex(re)
                }
                PatternKind::Substring => ClausePattern::Substring(def.pattern.to_owned()),
            };
            clauses.push(Clause::new(def.field, pattern));
            indicators.push(def.indicator.to_owned());
        }

        let rule = DetectionRule {
            id: self.id.to_owned(),
            name: self.name.to_owned(),
            technique: self.technique.to_owned(),
            tactic: self.tactic.to_owned(),
            severity: self.severity,
            description: self.description.to_owned(),
            clauses,
            indicators,
            confidence: self.confidence,
        };
        rule.validate()?;
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use ironscope_core::event::CanonicalField;

    use super::*;

    const SAMPLE_CLAUSES: &[ClauseDef] = &[
        ClauseDef::regex("CommandLine", r"(?i)whoami", "discovery_command"),
        ClauseDef::substring("Hashes", "MD5=", "md5_hash"),
    ];

    fn sample_def() -> RuleDef {
        RuleDef {
            id: "test_rule",
            name: "Test Rule",
            technique: "T1033",
            tactic: "discovery",
            severity: Severity::Low,
            description: "A test rule",
            confidence: 60,
            clauses: SAMPLE_CLAUSES,
        }
    }

    fn event_with_command(cmd: &str) -> Event {
        let mut event = Event::new(1, "t");
        event.set(CanonicalField::CommandLine, cmd);
        event
    }

    #[test]
    fn valid_definition_compiles() {
        let rule = sample_def().compile().unwrap();
        assert_eq!(rule.clauses.len(), 2);
        assert_eq!(rule.indicators, vec!["discovery_command", "md5_hash"]);
        assert_eq!(rule.clauses[0].pattern.kind(), PatternKind::Regex);
        assert_eq!(rule.clauses[1].pattern.as_str(), "MD5=");
    }

    #[test]
    fn invalid_regex_is_rejected() {
        const BAD: &[ClauseDef] = &[ClauseDef::regex("Image", "([unclosed", "x")];
        let def = RuleDef {
            clauses: BAD,
            ..sample_def()
        };
        let err = def.compile().unwrap_err();
        assert!(matches!(err, AnalysisError::RuleValidation { ref rule_id, .. } if rule_id == "test_rule"));
        assert!(err.to_string().contains("clause[0]"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let def = RuleDef {
            id: "",
            ..sample_def()
        };
        assert!(def.compile().is_err());
    }

    #[test]
    fn confidence_over_100_is_rejected() {
        let def = RuleDef {
            confidence: 101,
            ..sample_def()
        };
        let err = def.compile().unwrap_err();
        assert!(err.to_string().contains("exceeds 100"));
    }

    #[test]
    fn mismatched_indicators_are_rejected() {
        let mut rule = sample_def().compile().unwrap();
        rule.indicators.pop();
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("2 clauses but 1 indicators"));
    }

    #[test]
    fn clause_matches_canonical_field() {
        let rule = sample_def().compile().unwrap();
        assert!(rule.clauses[0].matches(&event_with_command("WHOAMI /all")));
        assert!(!rule.clauses[0].matches(&event_with_command("notepad.exe")));
    }

    #[test]
    fn clause_falls_back_to_extra_field() {
        let rule = sample_def().compile().unwrap();
        let mut event = event_with_command("x");
        event.extra.insert("Hashes".to_owned(), "MD5=abc,SHA256=def".to_owned());
        assert!(rule.clauses[1].matches(&event));
    }

    #[test]
    fn empty_canonical_field_falls_back_to_extra_of_same_name() {
        let rule = sample_def().compile().unwrap();
        let mut event = Event::new(1, "t");
        event.set(CanonicalField::Image, "C:\\Windows\\System32\\cmd.exe");
        event
            .extra
            .insert("CommandLine".to_owned(), "whoami /priv".to_owned());
        assert!(rule.clauses[0].matches(&event));
        assert_eq!(
            rule.clauses[0].value(&event).as_deref(),
            Some("whoami /priv")
        );
    }

    #[test]
    fn canonical_value_wins_over_extra() {
        let rule = sample_def().compile().unwrap();
        let mut event = event_with_command("notepad.exe");
        event
            .extra
            .insert("CommandLine".to_owned(), "whoami".to_owned());
        assert!(!rule.clauses[0].matches(&event));
    }

    #[test]
    fn substring_is_case_sensitive() {
        let pattern = ClausePattern::Substring("MD5=".to_owned());
        assert!(pattern.matches("MD5=1"));
        assert!(!pattern.matches("md5=1"));
    }

    #[test]
    fn missing_field_never_matches() {
        let rule = sample_def().compile().unwrap();
        let event = Event::new(1, "t");
        assert!(!rule.clauses[0].matches(&event));
        assert!(!rule.clauses[1].matches(&event));
    }

    #[test]
    fn pattern_serializes_with_kind() {
        let pattern = ClausePattern::Substring("abc".to_owned());
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["kind"], "substring");
        assert_eq!(json["pattern"], "abc");
    }
}
