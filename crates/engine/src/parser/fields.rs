//! 필드 이름 정규화 테이블
//!
//! 원본 헤더/키 이름을 정규 필드([`CanonicalField`])로 매핑합니다.
//! 표 형식 파서, 블록 파서, 형식 탐지기가 모두 이 테이블을 공유합니다.
//!
//! 비교는 대소문자, 공백, `_`, `-`를 무시합니다
//! (`Event ID`, `event_id`, `EventId`는 모두 같은 키).

use std::collections::HashMap;
use std::sync::LazyLock;

use ironscope_core::event::CanonicalField;

/// 정규 필드별 허용 표기
///
/// 첫 번째 항목이 정규 표기이며, 안내 메시지에 그대로 사용됩니다.
static FIELD_SPELLINGS: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::EventId,
        &["EventID", "EventId", "Event ID", "event_id", "Id"],
    ),
    (
        CanonicalField::Timestamp,
        &[
            "UtcTime",
            "TimeCreated",
            "Date and Time",
            "Date",
            "Timestamp",
            "Time",
            "SystemTime",
        ],
    ),
    (
        CanonicalField::Host,
        &["Computer", "ComputerName", "Hostname", "Host", "MachineName"],
    ),
    (
        CanonicalField::RecordId,
        &[
            "EventRecordID",
            "RecordID",
            "Record ID",
            "Event Record ID",
            "RecordNumber",
        ],
    ),
    (
        CanonicalField::Image,
        &["Image", "ProcessName", "NewProcessName", "Process Name"],
    ),
    (
        CanonicalField::CommandLine,
        &["CommandLine", "Command Line", "ProcessCommandLine"],
    ),
    (
        CanonicalField::ParentImage,
        &["ParentImage", "ParentProcessName"],
    ),
    (CanonicalField::ParentCommandLine, &["ParentCommandLine"]),
    (
        CanonicalField::User,
        &["User", "UserName", "SubjectUserName", "AccountName"],
    ),
    (CanonicalField::LogonId, &["LogonId", "SubjectLogonId"]),
    (
        CanonicalField::SourceIp,
        &["SourceIp", "SourceAddress", "SrcIp", "Source Network Address"],
    ),
    (CanonicalField::SourcePort, &["SourcePort", "SrcPort"]),
    (
        CanonicalField::DestinationIp,
        &["DestinationIp", "DestAddress", "DstIp", "DestinationAddress"],
    ),
    (
        CanonicalField::DestinationPort,
        &["DestinationPort", "DestPort", "DstPort"],
    ),
    (CanonicalField::Protocol, &["Protocol"]),
    (
        CanonicalField::TargetFilename,
        &["TargetFilename", "FileName"],
    ),
    (
        CanonicalField::TargetObject,
        &["TargetObject", "RegistryKey"],
    ),
    (CanonicalField::Details, &["Details", "RegistryValue"]),
    (CanonicalField::ScriptBlockText, &["ScriptBlockText"]),
    (CanonicalField::QueryName, &["QueryName", "DnsQuery"]),
    (CanonicalField::QueryResults, &["QueryResults"]),
    (CanonicalField::SourceProcessId, &["SourceProcessId"]),
    (CanonicalField::TargetProcessId, &["TargetProcessId"]),
    (CanonicalField::SourceImage, &["SourceImage"]),
    (CanonicalField::TargetImage, &["TargetImage"]),
    (CanonicalField::GrantedAccess, &["GrantedAccess"]),
];

/// 정규화된 키 → 정규 필드
static SYNONYMS: LazyLock<HashMap<String, CanonicalField>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (field, spellings) in FIELD_SPELLINGS {
        for spelling in *spellings {
            map.insert(normalize_key(spelling), *field);
        }
    }
    map
});

/// 비교용 키 정규화: 소문자 변환 후 공백, `_`, `-` 제거
pub fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// 원본 필드 이름을 정규 필드로 해석합니다.
pub fn canonical_field(raw: &str) -> Option<CanonicalField> {
    SYNONYMS.get(&normalize_key(raw)).copied()
}

/// 정규 필드의 허용 표기 목록
pub fn spellings(field: CanonicalField) -> &'static [&'static str] {
    FIELD_SPELLINGS
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, s)| *s)
        .unwrap_or(&[])
}

/// 원본 값 정리: 앞뒤 공백 제거, 빈 값과 `-`는 "값 없음"
pub fn clean_value(raw: &str) -> Option<&str> {
    let value = raw.trim();
    if value.is_empty() || value == "-" {
        None
    } else {
        Some(value)
    }
}

/// Sysmon 태스크 이름 → 이벤트 ID
static SYSMON_TASKS: &[(&str, u32)] = &[
    ("process create", 1),
    ("file creation time changed", 2),
    ("network connection detected", 3),
    ("sysmon service state changed", 4),
    ("process terminated", 5),
    ("driver loaded", 6),
    ("image loaded", 7),
    ("createremotethread detected", 8),
    ("rawaccessread detected", 9),
    ("process accessed", 10),
    ("file created", 11),
    ("registry object added or deleted", 12),
    ("registry value set", 13),
    ("registry object renamed", 14),
    ("file stream created", 15),
    ("sysmon config state changed", 16),
    ("pipe created", 17),
    ("pipe connected", 18),
    ("dns query", 22),
    ("file delete archived", 23),
    ("clipboard changed", 24),
    ("process tampering", 25),
    ("file delete logged", 26),
];

/// `Task` 값에서 이벤트 ID를 해석합니다.
///
/// 숫자이면 그대로 사용하고, 아니면 `(rule: ...)` 접미어를 제거한 뒤
/// Sysmon 태스크 이름 표와 비교합니다 (대소문자 무시).
pub fn event_id_from_task(task: &str) -> Option<u32> {
    let task = task.trim();
    if let Ok(code) = task.parse::<u32>() {
        return Some(code);
    }
    let name = task
        .split_once('(')
        .map_or(task, |(head, _)| head)
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase();
    SYSMON_TASKS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, code)| *code)
}

/// `Key: Value` 형식 줄을 첫 번째 콜론에서 분리합니다.
///
/// 콜론이 없거나 키가 필드 이름 형태가 아니면 `None`을 반환합니다.
/// 값은 [`clean_value`]로 정리되므로 없을 수 있습니다.
pub fn split_key_value(line: &str) -> Option<(&str, Option<&str>)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if !is_field_name(key) {
        return None;
    }
    Some((key, clean_value(value)))
}

/// 필드 이름 형태 검사: 비어 있지 않고, 영숫자/공백/`_`/`-`/`.`만 포함
fn is_field_name(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_synonyms_resolve() {
        for raw in ["EventID", "EventId", "Event ID", "event_id", "Id", "EVENT-ID"] {
            assert_eq!(
                canonical_field(raw),
                Some(CanonicalField::EventId),
                "{raw}"
            );
        }
    }

    #[test]
    fn timestamp_and_host_synonyms_resolve() {
        assert_eq!(
            canonical_field("Date and Time"),
            Some(CanonicalField::Timestamp)
        );
        assert_eq!(canonical_field("utctime"), Some(CanonicalField::Timestamp));
        assert_eq!(canonical_field("ComputerName"), Some(CanonicalField::Host));
    }

    #[test]
    fn provider_source_column_is_not_mapped() {
        // 이벤트 로그 내보내기의 Source 열은 공급자 이름
        assert_eq!(canonical_field("Source"), None);
        assert_eq!(canonical_field("Message"), None);
        assert_eq!(canonical_field("Hashes"), None);
    }

    #[test]
    fn spellings_start_with_canonical_form() {
        assert_eq!(spellings(CanonicalField::EventId)[0], "EventID");
        assert_eq!(spellings(CanonicalField::Timestamp)[0], "UtcTime");
    }

    #[test]
    fn every_canonical_field_has_spellings() {
        for field in CanonicalField::ALL {
            assert!(!spellings(field).is_empty(), "{field}");
            assert_eq!(canonical_field(field.name()), Some(field));
        }
    }

    #[test]
    fn clean_value_treats_dash_as_empty() {
        assert_eq!(clean_value("  -  "), None);
        assert_eq!(clean_value(""), None);
        assert_eq!(clean_value(" cmd.exe "), Some("cmd.exe"));
    }

    #[test]
    fn task_names_resolve_to_event_ids() {
        assert_eq!(event_id_from_task("Process Create (rule: ProcessCreate)"), Some(1));
        assert_eq!(event_id_from_task("Network connection detected"), Some(3));
        assert_eq!(event_id_from_task("Dns query (rule: DnsQuery)"), Some(22));
        assert_eq!(event_id_from_task("Process Create:"), Some(1));
        assert_eq!(event_id_from_task(" 13 "), Some(13));
        assert_eq!(event_id_from_task("Logon"), None);
    }

    #[test]
    fn split_key_value_uses_first_colon() {
        assert_eq!(
            split_key_value("Image: C:\\Windows\\cmd.exe"),
            Some(("Image", Some("C:\\Windows\\cmd.exe")))
        );
        assert_eq!(
            split_key_value("  Date: 2024-01-15T10:00:00.123"),
            Some(("Date", Some("2024-01-15T10:00:00.123")))
        );
        assert_eq!(split_key_value("Process Create:"), Some(("Process Create", None)));
        assert_eq!(split_key_value("no colon here"), None);
        assert_eq!(split_key_value("Hashes (SHA256): abc"), None);
    }
}
