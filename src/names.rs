//! Resource name derivation.
//!
//! Top-level resources get `<prefix><sep><suffix>` so reruns on different days
//! never collide inside the resource group; child resources (hub, rule,
//! database, container) are scoped by their parent and keep the bare label.
use crate::config::NamePrefixes;
use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Suffix format applied when `--suffix` is not given.
pub const SUFFIX_FORMAT: &str = "%Y%m%d";

/// Naming rule families enforced by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    EventHubNamespace,
    StorageAccount,
    CosmosAccount,
    FunctionApp,
    CognitiveAccount,
    LogicApp,
    Child,
}

struct NameRule {
    min_len: usize,
    max_len: usize,
    hyphens: bool,
    pattern: &'static str,
}

impl NameKind {
    fn rule(self) -> NameRule {
        match self {
            NameKind::EventHubNamespace => NameRule {
                min_len: 6,
                max_len: 50,
                hyphens: true,
                pattern: r"^[a-zA-Z][a-zA-Z0-9-]{4,48}[a-zA-Z0-9]$",
            },
            NameKind::StorageAccount => NameRule {
                min_len: 3,
                max_len: 24,
                hyphens: false,
                pattern: r"^[a-z0-9]{3,24}$",
            },
            NameKind::CosmosAccount => NameRule {
                min_len: 3,
                max_len: 44,
                hyphens: false,
                pattern: r"^[a-z0-9]{3,44}$",
            },
            NameKind::FunctionApp => NameRule {
                min_len: 2,
                max_len: 60,
                hyphens: true,
                pattern: r"^[a-zA-Z0-9][a-zA-Z0-9-]{0,58}[a-zA-Z0-9]$",
            },
            NameKind::CognitiveAccount => NameRule {
                min_len: 2,
                max_len: 64,
                hyphens: true,
                pattern: r"^[a-zA-Z0-9][a-zA-Z0-9-]{0,62}[a-zA-Z0-9]$",
            },
            NameKind::LogicApp => NameRule {
                min_len: 2,
                max_len: 80,
                hyphens: true,
                pattern: r"^[a-zA-Z0-9][a-zA-Z0-9-]{0,78}[a-zA-Z0-9]$",
            },
            NameKind::Child => NameRule {
                min_len: 1,
                max_len: 50,
                hyphens: true,
                pattern: r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,48}[a-zA-Z0-9])?$",
            },
        }
    }

    fn label(self) -> &'static str {
        match self {
            NameKind::EventHubNamespace => "event hubs namespace",
            NameKind::StorageAccount => "storage account",
            NameKind::CosmosAccount => "cosmos db account",
            NameKind::FunctionApp => "function app",
            NameKind::CognitiveAccount => "cognitive services account",
            NameKind::LogicApp => "logic app",
            NameKind::Child => "child resource",
        }
    }

    /// Check a name against the provider's rule for this kind.
    pub fn is_valid(self, name: &str) -> bool {
        static PATTERNS: OnceLock<Vec<(NameKind, Regex)>> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            ALL_KINDS
                .iter()
                .filter_map(|kind| {
                    Regex::new(kind.rule().pattern)
                        .ok()
                        .map(|regex| (*kind, regex))
                })
                .collect()
        });
        patterns
            .iter()
            .find(|(kind, _)| *kind == self)
            .is_some_and(|(_, regex)| regex.is_match(name))
    }
}

const ALL_KINDS: [NameKind; 7] = [
    NameKind::EventHubNamespace,
    NameKind::StorageAccount,
    NameKind::CosmosAccount,
    NameKind::FunctionApp,
    NameKind::CognitiveAccount,
    NameKind::LogicApp,
    NameKind::Child,
];

/// Concrete names for every resource a run touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNames {
    pub suffix: String,
    pub eventhub_namespace: String,
    pub eventhub: String,
    pub send_rule: String,
    pub storage_account: String,
    pub function_app: String,
    pub cognitive_account: String,
    pub cosmos_account: String,
    pub cosmos_database: String,
    pub cosmos_container: String,
    pub logic_app: String,
}

impl ResourceNames {
    pub fn derive(prefixes: &NamePrefixes, suffix: &str) -> Self {
        let suffix = sanitize_suffix(suffix);
        Self {
            eventhub_namespace: compose(
                NameKind::EventHubNamespace,
                &prefixes.eventhub_namespace,
                &suffix,
            ),
            eventhub: compose(NameKind::Child, &prefixes.eventhub, ""),
            send_rule: compose(NameKind::Child, &prefixes.send_rule, ""),
            storage_account: compose(NameKind::StorageAccount, &prefixes.storage_account, &suffix),
            function_app: compose(NameKind::FunctionApp, &prefixes.function_app, &suffix),
            cognitive_account: compose(
                NameKind::CognitiveAccount,
                &prefixes.cognitive_account,
                &suffix,
            ),
            cosmos_account: compose(NameKind::CosmosAccount, &prefixes.cosmos_account, &suffix),
            cosmos_database: compose(NameKind::Child, &prefixes.cosmos_database, ""),
            cosmos_container: compose(NameKind::Child, &prefixes.cosmos_container, ""),
            logic_app: compose(NameKind::LogicApp, &prefixes.logic_app, &suffix),
            suffix,
        }
    }

    /// Every name with its field label and rule family, in provisioning order.
    pub fn entries(&self) -> Vec<(&'static str, NameKind, &str)> {
        vec![
            ("eventhub_namespace", NameKind::EventHubNamespace, self.eventhub_namespace.as_str()),
            ("eventhub", NameKind::Child, self.eventhub.as_str()),
            ("send_rule", NameKind::Child, self.send_rule.as_str()),
            ("storage_account", NameKind::StorageAccount, self.storage_account.as_str()),
            ("function_app", NameKind::FunctionApp, self.function_app.as_str()),
            ("cognitive_account", NameKind::CognitiveAccount, self.cognitive_account.as_str()),
            ("cosmos_account", NameKind::CosmosAccount, self.cosmos_account.as_str()),
            ("cosmos_database", NameKind::Child, self.cosmos_database.as_str()),
            ("cosmos_container", NameKind::Child, self.cosmos_container.as_str()),
            ("logic_app", NameKind::LogicApp, self.logic_app.as_str()),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (field, kind, name) in self.entries() {
            if !kind.is_valid(name) {
                return Err(anyhow!("invalid {} name {name:?} ({field})", kind.label()));
            }
        }
        Ok(())
    }
}

/// Date-based suffix for the given instant.
pub fn date_suffix<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format(SUFFIX_FORMAT).to_string()
}

fn sanitize_suffix(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

fn sanitize_prefix(raw: &str, hyphens: bool) -> String {
    let mut out = String::new();
    for ch in raw.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if hyphens && (ch == '-' || ch == '_' || ch == ' ') && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_start_matches(|ch: char| !ch.is_ascii_alphabetic());
    let mut prefix = trimmed.trim_end_matches('-').to_string();
    if prefix.is_empty() {
        prefix.push('r');
    }
    prefix
}

fn compose(kind: NameKind, prefix: &str, suffix: &str) -> String {
    let rule = kind.rule();
    let mut prefix = sanitize_prefix(prefix, rule.hyphens);
    // Leave room for at least one prefix character plus separator.
    let suffix = &suffix[..suffix.len().min(rule.max_len - 2)];
    let separator = if rule.hyphens && !suffix.is_empty() {
        "-"
    } else {
        ""
    };
    let room = rule.max_len - suffix.len() - separator.len();
    prefix.truncate(room);
    let prefix = prefix.trim_end_matches('-');

    let mut name = format!("{prefix}{separator}{suffix}");
    while name.len() < rule.min_len {
        name.push('0');
    }
    name
}
