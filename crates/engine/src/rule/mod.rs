//! 탐지 규칙 엔진 -- 내장 규칙 기반 이벤트 매칭
//!
//! 규칙은 정적 테이블([`builtin::BUILTIN_RULES`])에서 한 번 컴파일되어
//! 불변 [`RuleSet`]으로 공유됩니다. 규칙은 서로 독립적으로 평가되며
//! 규칙별 에러 상태는 없습니다.
//!
//! # 아키텍처
//! - [`RuleEngine`]: 규칙 집합 평가 및 결과 정렬
//! - [`matcher`]: 규칙 하나의 매칭/지표 수집
//! - [`types`]: 규칙 데이터 구조 정의
//! - [`builtin`]: 내장 규칙 테이블

pub mod builtin;
pub mod matcher;
pub mod types;

pub use matcher::RuleMatcher;
pub use types::{Clause, ClauseDef, ClausePattern, DetectionRule, PatternKind, RuleDef};

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ironscope_core::event::Event;
use ironscope_core::types::Severity;

use crate::enrich::MitreTechnique;
use crate::error::AnalysisError;

/// 규칙 탐지 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// 규칙 ID
    pub rule_id: String,
    /// 규칙 이름
    pub name: String,
    /// MITRE ATT&CK 기법 ID
    pub technique: String,
    /// MITRE ATT&CK 전술
    pub tactic: String,
    /// 심각도
    pub severity: Severity,
    /// 설명
    pub description: String,
    /// 규칙 신뢰도
    pub confidence: u8,
    /// 매칭된 서로 다른 이벤트 수
    pub count: usize,
    /// 발동한 지표 (처음 발동한 순서, 중복 없음)
    pub indicators: Vec<String>,
    /// 매칭 이벤트 샘플
    pub samples: Vec<Event>,
    /// MITRE 메타데이터 (보강 후)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitre: Option<MitreTechnique>,
}

/// 불변 규칙 집합
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<DetectionRule>,
}

impl RuleSet {
    /// 규칙 목록으로 집합을 생성합니다.
    ///
    /// 각 규칙을 검증하고 중복 ID를 거부합니다.
    pub fn new(rules: Vec<DetectionRule>) -> Result<Self, AnalysisError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !seen.insert(rule.id.as_str()) {
                return Err(AnalysisError::RuleValidation {
                    rule_id: rule.id.clone(),
                    reason: "duplicate rule id".to_owned(),
                });
            }
        }
        Ok(Self { rules })
    }

    /// 내장 규칙 테이블을 컴파일합니다.
    pub fn builtin() -> Result<Self, AnalysisError> {
        let rules = builtin::BUILTIN_RULES
            .iter()
            .map(RuleDef::compile)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(rules = rules.len(), "built-in rules compiled");
        Self::new(rules)
    }

    /// ID로 규칙을 찾습니다.
    pub fn get(&self, id: &str) -> Option<&DetectionRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// 규칙 순회
    pub fn iter(&self) -> impl Iterator<Item = &DetectionRule> {
        self.rules.iter()
    }

    /// 규칙 수
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 규칙이 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// 규칙 엔진 -- 규칙 집합 평가 코디네이터
///
/// # 사용 예시
/// ```ignore
/// let rules = Arc::new(RuleSet::builtin()?);
/// let engine = RuleEngine::new(rules, 10);
/// let detections = engine.evaluate(&events);
/// ```
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Arc<RuleSet>,
    matcher: RuleMatcher,
}

impl RuleEngine {
    /// 새 규칙 엔진을 생성합니다.
    pub fn new(rules: Arc<RuleSet>, max_samples: usize) -> Self {
        Self {
            rules,
            matcher: RuleMatcher::new(max_samples),
        }
    }

    /// 규칙 집합
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// 모든 규칙을 평가하여 정렬된 탐지 목록을 반환합니다.
    ///
    /// 매칭이 없는 규칙은 결과에서 제외됩니다.
    pub fn evaluate(&self, events: &[Event]) -> Vec<Detection> {
        let mut detections: Vec<Detection> = self
            .rules
            .iter()
            .filter_map(|rule| self.matcher.evaluate(rule, events))
            .collect();
        sort_detections(&mut detections);
        debug!(
            rules = self.rules.len(),
            events = events.len(),
            detections = detections.len(),
            "rule evaluation complete"
        );
        detections
    }
}

/// 탐지 정렬: 심각도 내림차순, 건수 내림차순, 규칙 ID 오름차순
pub fn sort_detections(detections: &mut [Detection]) {
    detections.sort_by(compare_detections);
}

fn compare_detections(a: &Detection, b: &Detection) -> Ordering {
    b.severity
        .rank()
        .cmp(&a.severity.rank())
        .then_with(|| b.count.cmp(&a.count))
        .then_with(|| a.rule_id.cmp(&b.rule_id))
}
