//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 탐지 심각도와 이벤트 타입 코드를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 탐지 심각도
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Medium < High`).
/// 탐지 결과 정렬은 이 순서를 역순으로 사용합니다.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 낮은 심각도 -- 정찰/탐색 활동
    #[default]
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도 -- 즉시 확인 필요
    High,
}

impl Severity {
    /// 모든 심각도를 높은 순서로 반환합니다.
    pub const ALL: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];

    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// 정렬용 순위 (high=2, medium=1, low=0)
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// 소문자 레이블
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 정규 이벤트 타입 코드
///
/// Sysmon 이벤트 ID 체계를 따릅니다. 알 수 없는 코드는 [`EventType::Other`]로
/// 분류되지만, [`Event`](crate::event::Event)는 원래 숫자를 그대로 보존합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ProcessCreate,
    NetworkConnect,
    ProcessTerminate,
    ImageLoad,
    CreateRemoteThread,
    ProcessAccess,
    FileCreate,
    RegistryObject,
    RegistryValueSet,
    RegistryRename,
    FileStream,
    DnsQuery,
    FileDelete,
    Other(u32),
}

impl EventType {
    /// 숫자 코드에서 이벤트 타입을 결정합니다.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::ProcessCreate,
            3 => Self::NetworkConnect,
            5 => Self::ProcessTerminate,
            7 => Self::ImageLoad,
            8 => Self::CreateRemoteThread,
            10 => Self::ProcessAccess,
            11 => Self::FileCreate,
            12 => Self::RegistryObject,
            13 => Self::RegistryValueSet,
            14 => Self::RegistryRename,
            15 => Self::FileStream,
            22 => Self::DnsQuery,
            23 => Self::FileDelete,
            other => Self::Other(other),
        }
    }

    /// 숫자 코드
    pub fn code(self) -> u32 {
        match self {
            Self::ProcessCreate => 1,
            Self::NetworkConnect => 3,
            Self::ProcessTerminate => 5,
            Self::ImageLoad => 7,
            Self::CreateRemoteThread => 8,
            Self::ProcessAccess => 10,
            Self::FileCreate => 11,
            Self::RegistryObject => 12,
            Self::RegistryValueSet => 13,
            Self::RegistryRename => 14,
            Self::FileStream => 15,
            Self::DnsQuery => 22,
            Self::FileDelete => 23,
            Self::Other(code) => code,
        }
    }

    /// 레지스트리 이벤트(12, 13, 14) 여부
    pub fn is_registry(self) -> bool {
        matches!(
            self,
            Self::RegistryObject | Self::RegistryValueSet | Self::RegistryRename
        )
    }

    /// 사람이 읽을 수 있는 이름
    pub fn label(self) -> &'static str {
        match self {
            Self::ProcessCreate => "process-create",
            Self::NetworkConnect => "network-connect",
            Self::ProcessTerminate => "process-terminate",
            Self::ImageLoad => "image-load",
            Self::CreateRemoteThread => "create-remote-thread",
            Self::ProcessAccess => "process-access",
            Self::FileCreate => "file-create",
            Self::RegistryObject => "registry-object",
            Self::RegistryValueSet => "registry-value-set",
            Self::RegistryRename => "registry-rename",
            Self::FileStream => "file-stream",
            Self::DnsQuery => "dns-query",
            Self::FileDelete => "file-delete",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "other({code})"),
            _ => write!(f, "{}({})", self.label(), self.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High.rank() > Severity::Medium.rank());
    }

    #[test]
    fn severity_default_is_low() {
        assert_eq!(Severity::default(), Severity::Low);
    }

    #[test]
    fn severity_from_str_loose() {
        assert_eq!(Severity::from_str_loose("HIGH"), Some(Severity::High));
        assert_eq!(Severity::from_str_loose(" med "), Some(Severity::Medium));
        assert_eq!(Severity::from_str_loose("low"), Some(Severity::Low));
        assert_eq!(Severity::from_str_loose("critical"), None);
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
        let back: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(back, Severity::Medium);
    }

    #[test]
    fn event_type_code_roundtrip() {
        for code in [1, 3, 5, 7, 8, 10, 11, 12, 13, 14, 15, 22, 23, 4242] {
            assert_eq!(EventType::from_code(code).code(), code);
        }
    }

    #[test]
    fn registry_types_are_grouped() {
        assert!(EventType::from_code(12).is_registry());
        assert!(EventType::from_code(13).is_registry());
        assert!(EventType::from_code(14).is_registry());
        assert!(!EventType::from_code(11).is_registry());
    }

    #[test]
    fn event_type_display() {
        assert_eq!(EventType::from_code(1).to_string(), "process-create(1)");
        assert_eq!(EventType::from_code(99).to_string(), "other(99)");
    }
}
