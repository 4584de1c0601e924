//! MITRE ATT&CK 보강
//!
//! 탐지 결과의 기법 ID로 정적 기법 테이블을 조회하여 메타데이터를 붙입니다.
//! 테이블은 프로세스 전역 불변 데이터이며, 조회는 부수 효과가 없습니다.
//!
//! 하위 기법(`T1003.002` 등)이 테이블에 없으면 상위 기법으로 대체하지 않습니다.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::rule::Detection;

/// ATT&CK 기법 URL 접두어
const ATTACK_URL_BASE: &str = "https://attack.mitre.org/techniques/";

/// MITRE ATT&CK 기법 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitreTechnique {
    /// 기법 ID
    pub id: String,
    /// 기법 이름
    pub name: String,
    /// 설명
    pub description: String,
    /// 전술 목록
    pub tactics: Vec<String>,
    /// ATT&CK 페이지 URL
    pub url: String,
    /// 대상 플랫폼
    pub platforms: Vec<String>,
    /// 탐지 데이터 소스
    pub data_sources: Vec<String>,
}

/// 정적 기법 정의 (id, name, tactics, description, data_sources)
type TechniqueDef = (
    &'static str,
    &'static str,
    &'static [&'static str],
    &'static str,
    &'static [&'static str],
);

static TECHNIQUE_DEFS: &[TechniqueDef] = &[
    // Credential Access
    (
        "T1003",
        "OS Credential Dumping",
        &["credential-access"],
        "Adversaries may attempt to dump credentials to obtain account login and credential material.",
        &["Process: Process Access", "Command: Command Execution"],
    ),
    (
        "T1003.001",
        "LSASS Memory",
        &["credential-access"],
        "Adversaries may access credential material stored in the process memory of LSASS.",
        &["Process: Process Access", "Process: Process Creation", "Command: Command Execution"],
    ),
    (
        "T1552",
        "Unsecured Credentials",
        &["credential-access"],
        "Adversaries may search compromised systems to find and obtain insecurely stored credentials.",
        &["File: File Access", "Command: Command Execution"],
    ),
    (
        "T1552.001",
        "Credentials In Files",
        &["credential-access"],
        "Adversaries may search local file systems and remote file shares for files containing insecurely stored credentials.",
        &["File: File Access", "Command: Command Execution"],
    ),
    // Execution
    (
        "T1059",
        "Command and Scripting Interpreter",
        &["execution"],
        "Adversaries may abuse command and script interpreters to execute commands, scripts, or binaries.",
        &["Process: Process Creation", "Command: Command Execution"],
    ),
    (
        "T1059.001",
        "PowerShell",
        &["execution"],
        "Adversaries may abuse PowerShell commands and scripts for execution.",
        &["Script: Script Execution", "Process: Process Creation", "Command: Command Execution"],
    ),
    // Initial Access
    (
        "T1566.001",
        "Spearphishing Attachment",
        &["initial-access"],
        "Adversaries may send spearphishing emails with a malicious attachment to gain access to victim systems.",
        &["File: File Creation", "Process: Process Creation"],
    ),
    // Command and Control
    (
        "T1105",
        "Ingress Tool Transfer",
        &["command-and-control"],
        "Adversaries may transfer tools or other files from an external system into a compromised environment.",
        &["Network Traffic: Network Connection Creation", "File: File Creation"],
    ),
    (
        "T1071",
        "Application Layer Protocol",
        &["command-and-control"],
        "Adversaries may communicate using OSI application layer protocols to avoid detection by blending in with existing traffic.",
        &["Network Traffic: Network Traffic Content"],
    ),
    (
        "T1071.004",
        "DNS",
        &["command-and-control"],
        "Adversaries may communicate using the Domain Name System (DNS) application layer protocol.",
        &["Network Traffic: Network Traffic Content"],
    ),
    (
        "T1571",
        "Non-Standard Port",
        &["command-and-control"],
        "Adversaries may communicate using a protocol and port pairing that are typically not associated.",
        &["Network Traffic: Network Connection Creation"],
    ),
    // Persistence
    (
        "T1053",
        "Scheduled Task/Job",
        &["execution", "persistence", "privilege-escalation"],
        "Adversaries may abuse task scheduling functionality to facilitate initial or recurring execution of malicious code.",
        &["Scheduled Job: Scheduled Job Creation", "Command: Command Execution"],
    ),
    (
        "T1053.005",
        "Scheduled Task",
        &["execution", "persistence", "privilege-escalation"],
        "Adversaries may abuse the Windows Task Scheduler to perform task scheduling for execution.",
        &["Scheduled Job: Scheduled Job Creation", "Command: Command Execution"],
    ),
    (
        "T1547",
        "Boot or Logon Autostart Execution",
        &["persistence", "privilege-escalation"],
        "Adversaries may configure system settings to automatically execute a program during system boot or logon.",
        &["Windows Registry: Windows Registry Key Modification"],
    ),
    (
        "T1547.001",
        "Registry Run Keys / Startup Folder",
        &["persistence", "privilege-escalation"],
        "Adversaries may achieve persistence by adding a program to a startup folder or referencing it with a Registry run key.",
        &["Windows Registry: Windows Registry Key Modification", "Command: Command Execution"],
    ),
    // Impact
    (
        "T1490",
        "Inhibit System Recovery",
        &["impact"],
        "Adversaries may delete or remove built-in data and turn off services designed to aid in the recovery of a corrupted system.",
        &["Process: Process Creation", "Command: Command Execution"],
    ),
    // Defense Evasion
    (
        "T1070",
        "Indicator Removal",
        &["defense-evasion"],
        "Adversaries may delete or modify artifacts generated within systems to remove evidence of their presence.",
        &["Command: Command Execution"],
    ),
    (
        "T1070.001",
        "Clear Windows Event Logs",
        &["defense-evasion"],
        "Adversaries may clear Windows Event Logs to hide the activity of an intrusion.",
        &["Command: Command Execution", "Process: Process Creation"],
    ),
    (
        "T1218",
        "System Binary Proxy Execution",
        &["defense-evasion"],
        "Adversaries may bypass process and/or signature-based defenses by proxying execution of malicious content with signed binaries.",
        &["Process: Process Creation", "Command: Command Execution"],
    ),
    (
        "T1055",
        "Process Injection",
        &["defense-evasion", "privilege-escalation"],
        "Adversaries may inject code into processes in order to evade process-based defenses as well as possibly elevate privileges.",
        &["Process: OS API Execution", "Process: Process Access"],
    ),
    (
        "T1562",
        "Impair Defenses",
        &["defense-evasion"],
        "Adversaries may maliciously modify components of a victim environment in order to hinder or disable defensive mechanisms.",
        &["Windows Registry: Windows Registry Key Modification", "Command: Command Execution"],
    ),
    (
        "T1562.001",
        "Disable or Modify Tools",
        &["defense-evasion"],
        "Adversaries may modify and/or disable security tools to avoid possible detection of their malware/tools and activities.",
        &["Windows Registry: Windows Registry Key Modification", "Command: Command Execution"],
    ),
    (
        "T1036",
        "Masquerading",
        &["defense-evasion"],
        "Adversaries may attempt to manipulate features of their artifacts to make them appear legitimate or benign.",
        &["File: File Metadata", "Process: Process Metadata"],
    ),
    (
        "T1036.005",
        "Match Legitimate Name or Location",
        &["defense-evasion"],
        "Adversaries may match or approximate the name or location of legitimate files or resources when naming their tools.",
        &["File: File Metadata", "Image: Image Metadata"],
    ),
    // Discovery
    (
        "T1087",
        "Account Discovery",
        &["discovery"],
        "Adversaries may attempt to get a listing of valid accounts, usernames, or email addresses on a system or within an environment.",
        &["Process: Process Creation", "Command: Command Execution"],
    ),
    // Lateral Movement
    (
        "T1021",
        "Remote Services",
        &["lateral-movement"],
        "Adversaries may use valid accounts to log into a service that accepts remote connections.",
        &["Logon Session: Logon Session Creation", "Network Traffic: Network Connection Creation"],
    ),
    (
        "T1021.002",
        "SMB/Windows Admin Shares",
        &["lateral-movement"],
        "Adversaries may use valid accounts to interact with a remote network share using Server Message Block (SMB).",
        &["Network Share: Network Share Access", "Process: Process Creation"],
    ),
];

/// 기법 ID → 메타데이터
static TECHNIQUES: LazyLock<HashMap<&'static str, MitreTechnique>> = LazyLock::new(|| {
    TECHNIQUE_DEFS
        .iter()
        .map(|(id, name, tactics, description, data_sources)| {
            let technique = MitreTechnique {
                id: (*id).to_owned(),
                name: (*name).to_owned(),
                description: (*description).to_owned(),
                tactics: tactics.iter().map(|t| (*t).to_owned()).collect(),
                url: technique_url(id),
                platforms: vec!["Windows".to_owned()],
                data_sources: data_sources.iter().map(|d| (*d).to_owned()).collect(),
            };
            (*id, technique)
        })
        .collect()
});

/// `T1003.001` → `https://attack.mitre.org/techniques/T1003/001/`
fn technique_url(id: &str) -> String {
    format!("{ATTACK_URL_BASE}{}/", id.replace('.', "/"))
}

/// 기법 ID로 메타데이터를 조회합니다.
pub fn lookup(technique_id: &str) -> Option<&'static MitreTechnique> {
    TECHNIQUES.get(technique_id)
}

/// 탐지 결과에 MITRE 메타데이터를 붙입니다.
///
/// 알 수 없는 기법이면 입력을 그대로 반환합니다.
pub fn enrich(mut detection: Detection) -> Detection {
    if let Some(technique) = lookup(&detection.technique) {
        detection.mitre = Some(technique.clone());
    }
    detection
}

/// 탐지 목록 전체를 보강합니다 (순서 유지).
pub fn enrich_all(detections: Vec<Detection>) -> Vec<Detection> {
    detections.into_iter().map(enrich).collect()
}

#[cfg(test)]
mod tests {
    use ironscope_core::types::Severity;

    use super::*;
    use crate::rule::builtin::BUILTIN_RULES;

    fn detection(technique: &str) -> Detection {
        Detection {
            rule_id: "r".to_owned(),
            name: "r".to_owned(),
            technique: technique.to_owned(),
            tactic: "t".to_owned(),
            severity: Severity::Low,
            description: String::new(),
            confidence: 50,
            count: 1,
            indicators: vec![],
            samples: vec![],
            mitre: None,
        }
    }

    #[test]
    fn lookup_known_technique() {
        let t = lookup("T1003.001").unwrap();
        assert_eq!(t.name, "LSASS Memory");
        assert_eq!(t.url, "https://attack.mitre.org/techniques/T1003/001/");
        assert_eq!(t.tactics, vec!["credential-access"]);
    }

    #[test]
    fn parent_technique_url() {
        assert_eq!(
            lookup("T1105").unwrap().url,
            "https://attack.mitre.org/techniques/T1105/"
        );
    }

    #[test]
    fn unknown_technique_is_unchanged() {
        let before = detection("T9999");
        let after = enrich(before.clone());
        assert_eq!(before, after);
    }

    #[test]
    fn missing_sub_technique_does_not_fall_back_to_parent() {
        assert!(lookup("T1003").is_some());
        assert!(lookup("T1003.002").is_none());
        assert!(enrich(detection("T1003.002")).mitre.is_none());
    }

    #[test]
    fn every_builtin_technique_is_known() {
        for rule in BUILTIN_RULES {
            assert!(lookup(rule.technique).is_some(), "{}", rule.technique);
        }
    }

    #[test]
    fn enrich_all_keeps_order() {
        let out = enrich_all(vec![detection("T1490"), detection("T9999"), detection("T1055")]);
        assert_eq!(out[0].mitre.as_ref().unwrap().id, "T1490");
        assert!(out[1].mitre.is_none());
        assert_eq!(out[2].mitre.as_ref().unwrap().id, "T1055");
    }

    #[test]
    fn technique_ids_are_unique() {
        assert_eq!(TECHNIQUES.len(), TECHNIQUE_DEFS.len());
    }
}
