//! 규칙 매칭 로직 -- 조건 평가와 지표 수집
//!
//! [`RuleMatcher`]는 규칙 하나를 이벤트 목록 전체에 대해 평가합니다.
//! 매칭 여부와 발동한 지표 집합을 한 번의 순회로 계산합니다.

use ironscope_core::event::Event;

use super::Detection;
use super::types::DetectionRule;

/// 규칙 매처
#[derive(Debug, Clone, Copy)]
pub struct RuleMatcher {
    /// 탐지당 보관할 샘플 이벤트 수
    max_samples: usize,
}

impl RuleMatcher {
    /// 새 매처를 생성합니다.
    pub fn new(max_samples: usize) -> Self {
        Self { max_samples }
    }

    /// 이벤트가 규칙의 조건 중 하나라도 만족하면 `true`
    pub fn matches(&self, rule: &DetectionRule, event: &Event) -> bool {
        rule.clauses.iter().any(|clause| clause.matches(event))
    }

    /// 규칙을 이벤트 목록에 대해 평가합니다.
    ///
    /// 매칭된 이벤트가 없으면 `None`을 반환합니다.
    /// `count`는 매칭된 서로 다른 이벤트 수이며, 지표는 처음 발동한 순서로
    /// 중복 없이 수집됩니다.
    pub fn evaluate(&self, rule: &DetectionRule, events: &[Event]) -> Option<Detection> {
        let mut count = 0usize;
        let mut fired = vec![false; rule.clauses.len()];
        let mut indicators: Vec<String> = Vec::new();
        let mut samples = Vec::new();

        for event in events {
            let mut matched = false;
            for (idx, clause) in rule.clauses.iter().enumerate() {
                if !clause.matches(event) {
                    continue;
                }
                matched = true;
                if !fired[idx] {
                    fired[idx] = true;
                    let indicator = &rule.indicators[idx];
                    if !indicators.contains(indicator) {
                        indicators.push(indicator.clone());
                    }
                }
            }
            if matched {
                count += 1;
                if samples.len() < self.max_samples {
                    samples.push(event.clone());
                }
            }
        }

        if count == 0 {
            return None;
        }

        Some(Detection {
            rule_id: rule.id.clone(),
            name: rule.name.clone(),
            technique: rule.technique.clone(),
            tactic: rule.tactic.clone(),
            severity: rule.severity,
            description: rule.description.clone(),
            confidence: rule.confidence,
            count,
            indicators,
            samples,
            mitre: None,
        })
    }
}

impl Default for RuleMatcher {
    fn default() -> Self {
        Self::new(10)
    }
}
