//! 정규화된 호스트 활동 이벤트
//!
//! [`Event`]는 파서가 생성하는 유일한 이벤트 표현입니다. 표 형식(CSV)과
//! 블록 형식(텍스트 내보내기) 파서 모두 이 타입으로 수렴하며,
//! 규칙 엔진은 [`Event::field`]로 필드를 이름 기반 조회합니다.
//!
//! 정규 필드 집합에 없는 원본 필드는 [`Event::extra`]에 원래 이름 그대로
//! 보존되고, 이름 조회가 정규 필드에서 실패하면 `extra`로 넘어갑니다.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::EventType;

/// 정규 필드 식별자
///
/// 각 변형은 Sysmon 표기법의 정규 이름([`CanonicalField::name`])을 가집니다.
/// 원본 헤더의 동의어 → 정규 필드 매핑은 엔진의 필드 테이블이 담당합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    RecordId,
    EventId,
    Timestamp,
    Host,
    Image,
    CommandLine,
    ParentImage,
    ParentCommandLine,
    User,
    LogonId,
    SourceIp,
    SourcePort,
    DestinationIp,
    DestinationPort,
    Protocol,
    TargetFilename,
    TargetObject,
    Details,
    ScriptBlockText,
    QueryName,
    QueryResults,
    SourceProcessId,
    TargetProcessId,
    SourceImage,
    TargetImage,
    GrantedAccess,
}

impl CanonicalField {
    /// 모든 정규 필드
    pub const ALL: [CanonicalField; 26] = [
        Self::RecordId,
        Self::EventId,
        Self::Timestamp,
        Self::Host,
        Self::Image,
        Self::CommandLine,
        Self::ParentImage,
        Self::ParentCommandLine,
        Self::User,
        Self::LogonId,
        Self::SourceIp,
        Self::SourcePort,
        Self::DestinationIp,
        Self::DestinationPort,
        Self::Protocol,
        Self::TargetFilename,
        Self::TargetObject,
        Self::Details,
        Self::ScriptBlockText,
        Self::QueryName,
        Self::QueryResults,
        Self::SourceProcessId,
        Self::TargetProcessId,
        Self::SourceImage,
        Self::TargetImage,
        Self::GrantedAccess,
    ];

    /// 정규 이름 (Sysmon 표기)
    pub fn name(self) -> &'static str {
        match self {
            Self::RecordId => "EventRecordID",
            Self::EventId => "EventID",
            Self::Timestamp => "UtcTime",
            Self::Host => "Computer",
            Self::Image => "Image",
            Self::CommandLine => "CommandLine",
            Self::ParentImage => "ParentImage",
            Self::ParentCommandLine => "ParentCommandLine",
            Self::User => "User",
            Self::LogonId => "LogonId",
            Self::SourceIp => "SourceIp",
            Self::SourcePort => "SourcePort",
            Self::DestinationIp => "DestinationIp",
            Self::DestinationPort => "DestinationPort",
            Self::Protocol => "Protocol",
            Self::TargetFilename => "TargetFilename",
            Self::TargetObject => "TargetObject",
            Self::Details => "Details",
            Self::ScriptBlockText => "ScriptBlockText",
            Self::QueryName => "QueryName",
            Self::QueryResults => "QueryResults",
            Self::SourceProcessId => "SourceProcessId",
            Self::TargetProcessId => "TargetProcessId",
            Self::SourceImage => "SourceImage",
            Self::TargetImage => "TargetImage",
            Self::GrantedAccess => "GrantedAccess",
        }
    }

    /// 정규 이름으로 필드를 찾습니다 (대소문자 무시).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 이벤트 유효성 검증 실패 사유
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventValidationError {
    /// 숫자 이벤트 타입을 결정할 수 없음
    #[error("missing or non-numeric event id")]
    MissingEventType,

    /// 타임스탬프가 비어 있음
    #[error("missing timestamp")]
    MissingTimestamp,

    /// 식별 필드(Image, CommandLine, SourceIp, QueryName, TargetFilename)가 모두 없음
    #[error("no identifying field (Image, CommandLine, SourceIp, QueryName, TargetFilename)")]
    MissingIdentity,
}

/// 정규화된 로그 레코드 하나
///
/// 파서가 한 번 생성한 뒤에는 변경하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 원본 레코드 ID (비어 있을 수 있음)
    #[serde(default)]
    pub record_id: String,
    /// 이벤트 타입 코드 (1=프로세스 생성, 3=네트워크 연결, 11=파일 생성, ...)
    pub event_type: u32,
    /// 원본 타임스탬프 (재파싱하지 않고 그대로 전달)
    pub timestamp: String,
    /// 호스트명
    #[serde(default)]
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_command_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logon_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_object: Option<String>,
    /// 레지스트리 값 (TargetObject와 짝)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_block_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_process_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_process_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granted_access: Option<String>,

    /// 정규 필드에 속하지 않는 원본 필드 (원래 이름 유지)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Event {
    /// 이벤트 타입과 타임스탬프로 새 이벤트를 생성합니다.
    pub fn new(event_type: u32, timestamp: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: timestamp.into(),
            ..Self::default()
        }
    }

    /// 이벤트 타입 분류
    pub fn kind(&self) -> EventType {
        EventType::from_code(self.event_type)
    }

    /// 선택적 정규 필드에 대한 참조를 반환합니다.
    ///
    /// 항상 값이 있는 필드(EventID, UtcTime, Computer, EventRecordID)는 `None`입니다.
    fn optional_slot(&self, field: CanonicalField) -> Option<&Option<String>> {
        let slot = match field {
            CanonicalField::Image => &self.image,
            CanonicalField::CommandLine => &self.command_line,
            CanonicalField::ParentImage => &self.parent_image,
            CanonicalField::ParentCommandLine => &self.parent_command_line,
            CanonicalField::User => &self.user,
            CanonicalField::LogonId => &self.logon_id,
            CanonicalField::SourceIp => &self.source_ip,
            CanonicalField::SourcePort => &self.source_port,
            CanonicalField::DestinationIp => &self.destination_ip,
            CanonicalField::DestinationPort => &self.destination_port,
            CanonicalField::Protocol => &self.protocol,
            CanonicalField::TargetFilename => &self.target_filename,
            CanonicalField::TargetObject => &self.target_object,
            CanonicalField::Details => &self.details,
            CanonicalField::ScriptBlockText => &self.script_block_text,
            CanonicalField::QueryName => &self.query_name,
            CanonicalField::QueryResults => &self.query_results,
            CanonicalField::SourceProcessId => &self.source_process_id,
            CanonicalField::TargetProcessId => &self.target_process_id,
            CanonicalField::SourceImage => &self.source_image,
            CanonicalField::TargetImage => &self.target_image,
            CanonicalField::GrantedAccess => &self.granted_access,
            CanonicalField::RecordId
            | CanonicalField::EventId
            | CanonicalField::Timestamp
            | CanonicalField::Host => return None,
        };
        Some(slot)
    }

    fn optional_slot_mut(&mut self, field: CanonicalField) -> Option<&mut Option<String>> {
        let slot = match field {
            CanonicalField::Image => &mut self.image,
            CanonicalField::CommandLine => &mut self.command_line,
            CanonicalField::ParentImage => &mut self.parent_image,
            CanonicalField::ParentCommandLine => &mut self.parent_command_line,
            CanonicalField::User => &mut self.user,
            CanonicalField::LogonId => &mut self.logon_id,
            CanonicalField::SourceIp => &mut self.source_ip,
            CanonicalField::SourcePort => &mut self.source_port,
            CanonicalField::DestinationIp => &mut self.destination_ip,
            CanonicalField::DestinationPort => &mut self.destination_port,
            CanonicalField::Protocol => &mut self.protocol,
            CanonicalField::TargetFilename => &mut self.target_filename,
            CanonicalField::TargetObject => &mut self.target_object,
            CanonicalField::Details => &mut self.details,
            CanonicalField::ScriptBlockText => &mut self.script_block_text,
            CanonicalField::QueryName => &mut self.query_name,
            CanonicalField::QueryResults => &mut self.query_results,
            CanonicalField::SourceProcessId => &mut self.source_process_id,
            CanonicalField::TargetProcessId => &mut self.target_process_id,
            CanonicalField::SourceImage => &mut self.source_image,
            CanonicalField::TargetImage => &mut self.target_image,
            CanonicalField::GrantedAccess => &mut self.granted_access,
            CanonicalField::RecordId
            | CanonicalField::EventId
            | CanonicalField::Timestamp
            | CanonicalField::Host => return None,
        };
        Some(slot)
    }

    /// 정규 필드 값을 반환합니다.
    pub fn get(&self, field: CanonicalField) -> Option<Cow<'_, str>> {
        match field {
            CanonicalField::EventId => Some(Cow::Owned(self.event_type.to_string())),
            CanonicalField::Timestamp => non_empty(&self.timestamp),
            CanonicalField::Host => non_empty(&self.host),
            CanonicalField::RecordId => non_empty(&self.record_id),
            other => self
                .optional_slot(other)
                .and_then(|slot| slot.as_deref())
                .map(Cow::Borrowed),
        }
    }

    /// 정규 필드 값을 설정합니다. 빈 문자열은 "값 없음"으로 취급합니다.
    ///
    /// `EventID`는 숫자로 해석 가능한 경우에만 반영됩니다.
    pub fn set(&mut self, field: CanonicalField, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        match field {
            CanonicalField::EventId => {
                if let Ok(code) = value.trim().parse::<u32>() {
                    self.event_type = code;
                }
            }
            CanonicalField::Timestamp => self.timestamp = value,
            CanonicalField::Host => self.host = value,
            CanonicalField::RecordId => self.record_id = value,
            other => {
                if let Some(slot) = self.optional_slot_mut(other) {
                    *slot = Some(value);
                }
            }
        }
    }

    /// 이름으로 필드를 조회합니다.
    ///
    /// 정규 이름(대소문자 무시)을 먼저 확인하고, 없으면 `extra`에서
    /// 원래 이름 그대로 찾습니다.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        if let Some(canonical) = CanonicalField::from_name(name) {
            if let Some(value) = self.get(canonical) {
                return Some(value);
            }
        }
        self.extra.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }

    /// 이벤트 불변식을 검증합니다.
    ///
    /// 타임스탬프가 비어 있지 않아야 하고, 식별 필드 중 하나 이상이 있어야 합니다.
    /// 이벤트 타입 존재 여부는 파서가 `Event` 생성 전에 확인합니다.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.timestamp.trim().is_empty() {
            return Err(EventValidationError::MissingTimestamp);
        }
        let has_identity = self.image.is_some()
            || self.command_line.is_some()
            || self.source_ip.is_some()
            || self.query_name.is_some()
            || self.target_filename.is_some();
        if !has_identity {
            return Err(EventValidationError::MissingIdentity);
        }
        Ok(())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject = self
            .command_line
            .as_deref()
            .or(self.image.as_deref())
            .or(self.query_name.as_deref())
            .or(self.target_filename.as_deref())
            .or(self.source_ip.as_deref())
            .unwrap_or("-");
        let host = if self.host.is_empty() {
            "-"
        } else {
            self.host.as_str()
        };
        write!(f, "[{}] {} {}: {}", self.timestamp, host, self.kind(), subject)
    }
}

fn non_empty(value: &str) -> Option<Cow<'_, str>> {
    if value.is_empty() {
        None
    } else {
        Some(Cow::Borrowed(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_event() -> Event {
        let mut event = Event::new(1, "2024-01-15 10:00:00.123");
        event.set(CanonicalField::Host, "WS01");
        event.set(CanonicalField::Image, r"C:\Windows\System32\cmd.exe");
        event.set(CanonicalField::CommandLine, "cmd.exe /c whoami");
        event
            .extra
            .insert("IntegrityLevel".to_owned(), "High".to_owned());
        event
    }

    #[test]
    fn canonical_name_lookup_is_case_insensitive() {
        assert_eq!(
            CanonicalField::from_name("commandline"),
            Some(CanonicalField::CommandLine)
        );
        assert_eq!(
            CanonicalField::from_name("EVENTID"),
            Some(CanonicalField::EventId)
        );
        assert_eq!(CanonicalField::from_name("Hashes"), None);
    }

    #[test]
    fn field_prefers_canonical_then_extra() {
        let event = process_event();
        assert_eq!(
            event.field("CommandLine").as_deref(),
            Some("cmd.exe /c whoami")
        );
        assert_eq!(event.field("IntegrityLevel").as_deref(), Some("High"));
        assert_eq!(event.field("EventID").as_deref(), Some("1"));
        assert!(event.field("QueryName").is_none());
    }

    #[test]
    fn field_falls_back_to_extra_on_canonical_miss() {
        let mut event = process_event();
        // 정규 필드가 비어 있으면 같은 이름의 extra 값을 사용
        event
            .extra
            .insert("QueryName".to_owned(), "example.org".to_owned());
        assert_eq!(event.field("QueryName").as_deref(), Some("example.org"));
    }

    #[test]
    fn set_ignores_empty_values() {
        let mut event = process_event();
        event.set(CanonicalField::User, "");
        assert!(event.user.is_none());
    }

    #[test]
    fn set_event_id_requires_number() {
        let mut event = Event::new(1, "t");
        event.set(CanonicalField::EventId, "abc");
        assert_eq!(event.event_type, 1);
        event.set(CanonicalField::EventId, " 22 ");
        assert_eq!(event.event_type, 22);
    }

    #[test]
    fn validate_accepts_complete_event() {
        process_event().validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_timestamp() {
        let mut event = process_event();
        event.timestamp = "  ".to_owned();
        assert_eq!(
            event.validate(),
            Err(EventValidationError::MissingTimestamp)
        );
    }

    #[test]
    fn validate_rejects_missing_identity() {
        let mut event = Event::new(3, "2024-01-15");
        event.set(CanonicalField::DestinationIp, "10.0.0.1");
        assert_eq!(event.validate(), Err(EventValidationError::MissingIdentity));

        event.set(CanonicalField::SourceIp, "10.0.0.2");
        event.validate().unwrap();
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let json = serde_json::to_value(process_event()).unwrap();
        assert_eq!(json["event_type"], 1);
        assert!(json.get("query_name").is_none());
        assert_eq!(json["extra"]["IntegrityLevel"], "High");
    }

    #[test]
    fn display_uses_most_specific_subject() {
        let display = process_event().to_string();
        assert!(display.contains("WS01"));
        assert!(display.contains("process-create(1)"));
        assert!(display.contains("whoami"));
    }
}
