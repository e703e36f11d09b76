//! Classification results.

use serde::Serialize;
use std::fmt;

/// Evidence strings longer than this many characters are truncated.
pub const EVIDENCE_LIMIT: usize = 120;

/// Why a survivor of sanitization is considered a bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    DisallowedTagSurvived,
    EventHandlerSurvived,
    DangerousSchemeSurvived,
    DangerousDataUriSurvived,
    UnsafeStyleSurvived,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::DisallowedTagSurvived => "DISALLOWED_TAG_SURVIVED",
            ReasonCode::EventHandlerSurvived => "EVENT_HANDLER_SURVIVED",
            ReasonCode::DangerousSchemeSurvived => "DANGEROUS_SCHEME_SURVIVED",
            ReasonCode::DangerousDataUriSurvived => "DANGEROUS_DATA_URI_SURVIVED",
            ReasonCode::UnsafeStyleSurvived => "UNSAFE_STYLE_SURVIVED",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the tree something was found: `tag` or `tag.attribute`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub tag: String,
    pub attribute: Option<String>,
}

impl Location {
    pub fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            attribute: None,
        }
    }

    pub fn attribute(tag: &str, attribute: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            attribute: Some(attribute.to_lowercase()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attribute) => write!(f, "{}.{}", self.tag, attribute),
            None => f.write_str(&self.tag),
        }
    }
}

/// The offending value before and after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub raw: String,
    pub normalized: String,
}

impl Evidence {
    pub fn new(raw: &str, normalized: &str) -> Self {
        Self {
            raw: truncate(raw),
            normalized: truncate(normalized),
        }
    }
}

fn truncate(value: &str) -> String {
    match value.char_indices().nth(EVIDENCE_LIMIT) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub reason: ReasonCode,
    pub location: Location,
    pub evidence: Evidence,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}: {:?}",
            self.reason, self.location, self.evidence.normalized
        )
    }
}

/// Why a suspicious value was kept as a lead rather than a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadKind {
    /// Scheme token inside a `#fragment`.
    FragmentScheme,
    /// Scheme token inside a relative path such as `/x/javascript:`.
    RelativePathScheme,
    /// Scheme token embedded after a harmless scheme, e.g. in a query string.
    EmbeddedSchemeToken,
    /// The whole cleaned document matched a danger marker as plain text.
    DocumentText,
}

/// A non-actionable observation worth keeping out of the findings list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lead {
    pub kind: LeadKind,
    pub location: Location,
    pub evidence: Evidence,
    /// Untruncated raw value, used to tell leads apart.
    #[serde(skip)]
    pub value: String,
}

impl Lead {
    pub fn new(kind: LeadKind, location: Location, raw: &str, normalized: &str) -> Self {
        Self {
            kind,
            location,
            evidence: Evidence::new(raw, normalized),
            value: raw.to_string(),
        }
    }
}

/// Outcome of classifying one sanitized tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    safe: bool,
    findings: Vec<Finding>,
    leads: Vec<Lead>,
}

impl Default for Verdict {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Verdict {
    pub fn new(findings: Vec<Finding>, leads: Vec<Lead>) -> Self {
        Self {
            safe: findings.is_empty(),
            findings,
            leads,
        }
    }

    /// True iff no findings were recorded. Leads never affect safety.
    pub fn is_safe(&self) -> bool {
        self.safe
    }

    /// Findings in traversal order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn has_reason(&self, reason: ReasonCode) -> bool {
        self.findings.iter().any(|f| f.reason == reason)
    }

    /// Distinct reason codes, in order of first appearance.
    pub fn reasons(&self) -> Vec<ReasonCode> {
        let mut reasons = Vec::new();
        for finding in &self.findings {
            if !reasons.contains(&finding.reason) {
                reasons.push(finding.reason);
            }
        }
        reasons
    }

    /// Adds leads found outside the tree walk.
    pub fn push_lead(&mut self, lead: Lead) {
        self.leads.push(lead);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
