//! 내장 탐지 규칙 테이블
//!
//! 모든 규칙은 컴파일 타임 상수이며 [`RuleSet::builtin`](super::RuleSet::builtin)에서
//! 한 번 컴파일됩니다. 외부 규칙 파일은 지원하지 않습니다.

use ironscope_core::types::Severity;

use super::types::{ClauseDef, RuleDef};

/// 내장 규칙 정의
pub static BUILTIN_RULES: &[RuleDef] = &[
    // --- Credential Access ---
    RuleDef {
        id: "credential_dumping",
        name: "LSASS Credential Dumping",
        technique: "T1003.001",
        tactic: "credential-access",
        severity: Severity::High,
        description: "Known credential dumping tooling or LSASS memory dump commands",
        confidence: 90,
        clauses: &[
            ClauseDef::regex(
                "CommandLine",
                r"(?i)(invoke-mimikatz|mimikatz|sekurlsa::|lsadump::|comsvcs(\.dll)?.*minidump|procdump(64)?(\.exe)?.*lsass)",
                "credential_dumping",
            ),
            ClauseDef::regex(
                "Image",
                r"(?i)\\(mimikatz|procdump|procdump64)\.exe$",
                "credential_tool_binary",
            ),
        ],
    },
    RuleDef {
        id: "credential_file_search",
        name: "Credential Search in Files",
        technique: "T1552.001",
        tactic: "credential-access",
        severity: Severity::Medium,
        description: "Searching files for stored passwords or credential material",
        confidence: 60,
        clauses: &[
            ClauseDef::regex(
                "CommandLine",
                r"(?i)findstr(\.exe)?\s.*(password|passwd|pwd|credential)",
                "findstr_password",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)(select-string|sls)\s.*(password|passwd|credential)",
                "select_string_password",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)(dir|gci|get-childitem)\s.*(\.kdbx|unattend\.xml|\*password\*)",
                "credential_file_listing",
            ),
        ],
    },
    // --- Execution ---
    RuleDef {
        id: "encoded_powershell",
        name: "Encoded PowerShell Command",
        technique: "T1059.001",
        tactic: "execution",
        severity: Severity::Medium,
        description: "PowerShell launched with an encoded command or hidden window",
        confidence: 75,
        clauses: &[
            ClauseDef::regex(
                "CommandLine",
                r"(?i)powershell(\.exe)?\s(.*\s)?-(e|ec|en|enc|enco|encodedcommand)\s+[a-z0-9+/=]{16,}",
                "encoded_command",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)powershell(\.exe)?\s(.*\s)?-(w|windowstyle)\s+hidden",
                "hidden_window",
            ),
            ClauseDef::regex(
                "ScriptBlockText",
                r"(?i)frombase64string",
                "base64_decoding",
            ),
        ],
    },
    RuleDef {
        id: "office_child_process",
        name: "Office Application Spawning Process",
        technique: "T1566.001",
        tactic: "initial-access",
        severity: Severity::Medium,
        description: "Process started by an Office application, typical of malicious attachments",
        confidence: 65,
        clauses: &[
            ClauseDef::regex(
                "ParentImage",
                r"(?i)\\(winword|excel|powerpnt|outlook|onenote|mspub)\.exe$",
                "office_parent",
            ),
            ClauseDef::regex(
                "ParentCommandLine",
                r"(?i)\.(docm|xlsm|pptm|dotm)\b",
                "macro_document",
            ),
        ],
    },
    // --- Command and Control ---
    RuleDef {
        id: "download_cradle",
        name: "Download Cradle",
        technique: "T1105",
        tactic: "command-and-control",
        severity: Severity::Medium,
        description: "Command line fetching a remote payload with a built-in utility",
        confidence: 70,
        clauses: &[
            ClauseDef::regex(
                "CommandLine",
                r"(?i)(downloadstring|downloadfile|downloaddata|invoke-webrequest|\biwr\s+https?://|start-bitstransfer)",
                "download_cradle",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)certutil(\.exe)?\s.*-urlcache",
                "certutil_download",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)bitsadmin(\.exe)?\s.*/transfer",
                "bitsadmin_transfer",
            ),
        ],
    },
    RuleDef {
        id: "suspicious_dns_query",
        name: "Suspicious DNS Query",
        technique: "T1071.004",
        tactic: "command-and-control",
        severity: Severity::Low,
        description: "DNS lookup of a low-reputation TLD or tunnelling/dynamic DNS service",
        confidence: 40,
        clauses: &[
            ClauseDef::regex(
                "QueryName",
                r"(?i)\.(top|xyz|tk|ml|ga|cf|gq|onion|bit)$",
                "suspicious_tld",
            ),
            ClauseDef::regex(
                "QueryName",
                r"(?i)(ngrok\.io|duckdns\.org|no-ip\.com|pastebin\.com|transfer\.sh)$",
                "tunnel_or_paste_service",
            ),
        ],
    },
    RuleDef {
        id: "non_standard_port",
        name: "Connection to Non-Standard Port",
        technique: "T1571",
        tactic: "command-and-control",
        severity: Severity::Low,
        description: "Outbound connection to a port commonly used by remote access tooling",
        confidence: 45,
        clauses: &[ClauseDef::regex(
            "DestinationPort",
            r"^(4444|1337|31337|5555|6666|6667|9001|12345)$",
            "non_standard_port",
        )],
    },
    // --- Persistence ---
    RuleDef {
        id: "scheduled_task_creation",
        name: "Scheduled Task Creation",
        technique: "T1053.005",
        tactic: "persistence",
        severity: Severity::Medium,
        description: "A scheduled task was registered from the command line",
        confidence: 60,
        clauses: &[
            ClauseDef::regex(
                "CommandLine",
                r"(?i)schtasks(\.exe)?\s.*/create",
                "schtasks_create",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)(register-scheduledtask|new-scheduledtask)",
                "powershell_scheduled_task",
            ),
        ],
    },
    RuleDef {
        id: "registry_run_key",
        name: "Registry Run Key Persistence",
        technique: "T1547.001",
        tactic: "persistence",
        severity: Severity::Medium,
        description: "Autostart Run/RunOnce registry key modified",
        confidence: 70,
        clauses: &[
            ClauseDef::regex(
                "TargetObject",
                r"(?i)\\software\\(wow6432node\\)?microsoft\\windows\\currentversion\\(run|runonce|runonceex)\\",
                "run_key_modification",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)reg(\.exe)?\s+add\s.*\\currentversion\\run",
                "reg_add_run_key",
            ),
        ],
    },
    // --- Impact ---
    RuleDef {
        id: "shadow_copy_deletion",
        name: "Shadow Copy Deletion",
        technique: "T1490",
        tactic: "impact",
        severity: Severity::High,
        description: "Volume shadow copies deleted or system recovery disabled",
        confidence: 90,
        clauses: &[
            ClauseDef::regex(
                "CommandLine",
                r"(?i)vssadmin(\.exe)?\s+delete\s+shadows",
                "vssadmin_delete",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)wmic(\.exe)?\s+shadowcopy\s+delete",
                "wmic_shadowcopy_delete",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)bcdedit(\.exe)?\s.*recoveryenabled\s+no",
                "recovery_disabled",
            ),
        ],
    },
    // --- Defense Evasion ---
    RuleDef {
        id: "event_log_clearing",
        name: "Event Log Clearing",
        technique: "T1070.001",
        tactic: "defense-evasion",
        severity: Severity::High,
        description: "Windows event logs cleared from the command line",
        confidence: 85,
        clauses: &[
            ClauseDef::regex(
                "CommandLine",
                r"(?i)wevtutil(\.exe)?\s+(cl|clear-log)\s",
                "wevtutil_clear",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)(clear-eventlog|remove-eventlog)",
                "powershell_clear_eventlog",
            ),
        ],
    },
    RuleDef {
        id: "lolbin_proxy_execution",
        name: "Signed Binary Proxy Execution",
        technique: "T1218",
        tactic: "defense-evasion",
        severity: Severity::Medium,
        description: "Trusted system binary used to run remote or script content",
        confidence: 70,
        clauses: &[
            ClauseDef::regex(
                "CommandLine",
                r"(?i)regsvr32(\.exe)?\s.*/i:https?://",
                "regsvr32_remote_scriptlet",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)mshta(\.exe)?\s+(https?://|javascript:|vbscript:)",
                "mshta_remote",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)rundll32(\.exe)?\s.*javascript:",
                "rundll32_script",
            ),
        ],
    },
    RuleDef {
        id: "process_injection",
        name: "Process Injection",
        technique: "T1055",
        tactic: "defense-evasion",
        severity: Severity::High,
        description: "Remote thread creation or full-access handle to another process",
        confidence: 70,
        clauses: &[
            ClauseDef::regex("EventID", r"^8$", "remote_thread_creation"),
            ClauseDef::regex(
                "GrantedAccess",
                r"(?i)^0x(1f0fff|1fffff|1f3fff|143a)$",
                "full_process_access",
            ),
        ],
    },
    RuleDef {
        id: "defender_tampering",
        name: "Microsoft Defender Tampering",
        technique: "T1562.001",
        tactic: "defense-evasion",
        severity: Severity::High,
        description: "Defender protection disabled through policy or PowerShell",
        confidence: 85,
        clauses: &[
            ClauseDef::substring(
                "TargetObject",
                r"\Windows Defender\DisableAntiSpyware",
                "antispyware_policy_disabled",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)set-mppreference\s.*-disable(realtimemonitoring|behaviormonitoring|ioavprotection|scriptscanning)",
                "mppreference_disable",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)add-mppreference\s.*-exclusion(path|process|extension)",
                "exclusion_added",
            ),
        ],
    },
    RuleDef {
        id: "process_masquerading",
        name: "System Binary Masquerading",
        technique: "T1036.005",
        tactic: "defense-evasion",
        severity: Severity::Medium,
        description: "System process name running from a user-writable directory",
        confidence: 75,
        clauses: &[ClauseDef::regex(
            "Image",
            r"(?i)\\(users|programdata|temp|windows\\temp|perflogs)\\(.*\\)?(svchost|lsass|csrss|services|winlogon|smss|wininit|explorer)\.exe$",
            "system_name_wrong_path",
        )],
    },
    // --- Discovery ---
    RuleDef {
        id: "account_discovery",
        name: "Account and Domain Discovery",
        technique: "T1087",
        tactic: "discovery",
        severity: Severity::Low,
        description: "Enumeration of local or domain accounts and trusts",
        confidence: 50,
        clauses: &[
            ClauseDef::regex(
                "CommandLine",
                r"(?i)\bnet1?(\.exe)?\s+(user|group|localgroup)\b",
                "account_enumeration",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)\bwhoami(\.exe)?\s+/(all|groups|priv)",
                "privilege_enumeration",
            ),
            ClauseDef::substring(
                "CommandLine",
                "nltest /domain_trusts",
                "domain_trust_discovery",
            ),
        ],
    },
    // --- Lateral Movement ---
    RuleDef {
        id: "psexec_lateral_movement",
        name: "PsExec / Admin Share Lateral Movement",
        technique: "T1021.002",
        tactic: "lateral-movement",
        severity: Severity::High,
        description: "PsExec service binary or remote administrative share access",
        confidence: 75,
        clauses: &[
            ClauseDef::regex(
                "Image",
                r"(?i)\\(psexec|psexec64|psexesvc)\.exe$",
                "psexec_binary",
            ),
            ClauseDef::regex(
                "CommandLine",
                r"(?i)\\\\[a-z0-9._-]+\\(admin|c|ipc)\$",
                "admin_share_access",
            ),
        ],
    },
];
