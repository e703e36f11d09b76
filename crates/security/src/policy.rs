//! Classification policy and its builder.
//!
//! A [`Policy`] says which survivors of sanitization count as findings: the
//! tags that must never come out of the cleaner, the attributes that carry
//! URLs, the schemes that execute script and the CSS tokens that smuggle it.
//! Two presets ship with the crate. `strict` targets precision; `wide-net`
//! widens the net for exploratory fuzzing and accepts more noise.

use crate::error::{SecurityError, SecurityResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Decode rounds applied when a policy does not say otherwise.
pub const DEFAULT_MAX_DECODE_ROUNDS: usize = 5;

const STRICT_DISALLOWED_TAGS: &[&str] = &["script", "iframe", "embed", "object", "base"];
const WIDE_NET_EXTRA_TAGS: &[&str] = &["svg", "math", "link"];

const URL_BEARING_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "xlink:href",
    "formaction",
    "action",
    "poster",
    "data",
    "srcset",
    "cite",
];

const DANGEROUS_SCHEMES: &[&str] = &["javascript", "vbscript"];

const STRICT_STYLE_TOKENS: &[&str] = &["expression(", "url(javascript:", "javascript:", "@import"];
const WIDE_NET_EXTRA_STYLE_TOKENS: &[&str] = &["vbscript:", "behavior:", "-moz-binding"];

/// Named policy presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyPreset {
    /// Low false-positive rate, suited to continuous fuzzing.
    #[default]
    Strict,
    /// Broader tag set plus a text scan of the whole cleaned document.
    WideNet,
}

impl PolicyPreset {
    pub fn name(self) -> &'static str {
        match self {
            PolicyPreset::Strict => "strict",
            PolicyPreset::WideNet => "wide-net",
        }
    }

    /// Materializes the preset.
    pub fn policy(self) -> Policy {
        match self {
            PolicyPreset::Strict => Policy::from_parts(
                to_set(STRICT_DISALLOWED_TAGS),
                to_set(URL_BEARING_ATTRIBUTES),
                to_set(DANGEROUS_SCHEMES),
                to_set(STRICT_STYLE_TOKENS),
                DEFAULT_MAX_DECODE_ROUNDS,
                false,
                false,
            ),
            PolicyPreset::WideNet => Policy::from_parts(
                to_set(STRICT_DISALLOWED_TAGS.iter().chain(WIDE_NET_EXTRA_TAGS)),
                to_set(URL_BEARING_ATTRIBUTES),
                to_set(DANGEROUS_SCHEMES),
                to_set(STRICT_STYLE_TOKENS.iter().chain(WIDE_NET_EXTRA_STYLE_TOKENS)),
                DEFAULT_MAX_DECODE_ROUNDS,
                true,
                true,
            ),
        }
    }
}

impl fmt::Display for PolicyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyPreset {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(PolicyPreset::Strict),
            "wide-net" | "wide_net" | "widenet" => Ok(PolicyPreset::WideNet),
            other => Err(SecurityError::UnknownPreset {
                name: other.to_string(),
            }),
        }
    }
}

/// Rules the classifier applies to a sanitized tree.
///
/// All names are stored lowercase. Lookups lowercase their argument, so
/// callers may pass names exactly as the parser produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    disallowed_tags: BTreeSet<String>,
    url_bearing_attributes: BTreeSet<String>,
    dangerous_schemes: BTreeSet<String>,
    dangerous_style_tokens: BTreeSet<String>,
    /// `"<scheme>:"` for every dangerous scheme, precomputed for substring scans.
    scheme_tokens: Vec<String>,
    max_decode_rounds: usize,
    wide_text_scan: bool,
    flag_empty_event_handlers: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self::strict()
    }
}

impl Policy {
    pub fn strict() -> Self {
        PolicyPreset::Strict.policy()
    }

    pub fn wide_net() -> Self {
        PolicyPreset::WideNet.policy()
    }

    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::new()
    }

    fn from_parts(
        disallowed_tags: BTreeSet<String>,
        url_bearing_attributes: BTreeSet<String>,
        dangerous_schemes: BTreeSet<String>,
        dangerous_style_tokens: BTreeSet<String>,
        max_decode_rounds: usize,
        wide_text_scan: bool,
        flag_empty_event_handlers: bool,
    ) -> Self {
        let scheme_tokens = dangerous_schemes.iter().map(|s| format!("{}:", s)).collect();
        Self {
            disallowed_tags,
            url_bearing_attributes,
            dangerous_schemes,
            dangerous_style_tokens,
            scheme_tokens,
            max_decode_rounds,
            wide_text_scan,
            flag_empty_event_handlers,
        }
    }

    pub fn is_disallowed_tag(&self, tag: &str) -> bool {
        self.disallowed_tags.contains(&tag.to_lowercase())
    }

    pub fn is_url_bearing(&self, attribute: &str) -> bool {
        self.url_bearing_attributes.contains(&attribute.to_lowercase())
    }

    pub fn is_dangerous_scheme(&self, scheme: &str) -> bool {
        self.dangerous_schemes.contains(&scheme.to_lowercase())
    }

    pub fn disallowed_tags(&self) -> impl Iterator<Item = &str> {
        self.disallowed_tags.iter().map(String::as_str)
    }

    pub fn url_bearing_attributes(&self) -> impl Iterator<Item = &str> {
        self.url_bearing_attributes.iter().map(String::as_str)
    }

    pub fn dangerous_schemes(&self) -> impl Iterator<Item = &str> {
        self.dangerous_schemes.iter().map(String::as_str)
    }

    pub fn dangerous_style_tokens(&self) -> impl Iterator<Item = &str> {
        self.dangerous_style_tokens.iter().map(String::as_str)
    }

    /// First `"<scheme>:"` token of a dangerous scheme found in `text`, with its byte offset.
    pub fn find_scheme_token(&self, text: &str) -> Option<(usize, &str)> {
        self.scheme_tokens
            .iter()
            .filter_map(|token| text.find(token.as_str()).map(|at| (at, token.as_str())))
            .min_by_key(|(at, _)| *at)
    }

    pub fn max_decode_rounds(&self) -> usize {
        self.max_decode_rounds
    }

    /// Whether the classifier also scans the whole cleaned document as text.
    pub fn wide_text_scan(&self) -> bool {
        self.wide_text_scan
    }

    /// Whether an `on*` attribute with an empty value is still a finding.
    pub fn flags_empty_event_handlers(&self) -> bool {
        self.flag_empty_event_handlers
    }
}

/// Builder for [`Policy`] instances. Starts empty unless seeded from a preset.
#[derive(Debug, Default, Clone)]
pub struct PolicyBuilder {
    disallowed_tags: BTreeSet<String>,
    url_bearing_attributes: BTreeSet<String>,
    dangerous_schemes: BTreeSet<String>,
    dangerous_style_tokens: BTreeSet<String>,
    max_decode_rounds: Option<usize>,
    wide_text_scan: Option<bool>,
    flag_empty_event_handlers: Option<bool>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a preset so callers only spell out the differences.
    pub fn from_preset(preset: PolicyPreset) -> Self {
        let policy = preset.policy();
        Self {
            disallowed_tags: policy.disallowed_tags,
            url_bearing_attributes: policy.url_bearing_attributes,
            dangerous_schemes: policy.dangerous_schemes,
            dangerous_style_tokens: policy.dangerous_style_tokens,
            max_decode_rounds: Some(policy.max_decode_rounds),
            wide_text_scan: Some(policy.wide_text_scan),
            flag_empty_event_handlers: Some(policy.flag_empty_event_handlers),
        }
    }

    /// Adds tags that must never survive sanitization. Input is converted to lowercase.
    pub fn disallow_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.disallowed_tags.extend(tags.into_iter().map(|s| s.as_ref().trim().to_lowercase()));
        self
    }

    /// Removes tags from the disallowed set.
    pub fn permit_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.disallowed_tags.remove(&tag.as_ref().trim().to_lowercase());
        }
        self
    }

    pub fn url_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.url_bearing_attributes
            .extend(attributes.into_iter().map(|s| s.as_ref().trim().to_lowercase()));
        self
    }

    /// Adds script-executing schemes. A trailing `:` is accepted and dropped.
    pub fn dangerous_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.dangerous_schemes.extend(
            schemes
                .into_iter()
                .map(|s| s.as_ref().trim().trim_end_matches(':').to_lowercase()),
        );
        self
    }

    pub fn dangerous_style_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.dangerous_style_tokens
            .extend(tokens.into_iter().map(|s| s.as_ref().trim().to_lowercase()));
        self
    }

    pub fn max_decode_rounds(mut self, rounds: usize) -> Self {
        self.max_decode_rounds = Some(rounds);
        self
    }

    pub fn wide_text_scan(mut self, enabled: bool) -> Self {
        self.wide_text_scan = Some(enabled);
        self
    }

    pub fn flag_empty_event_handlers(mut self, enabled: bool) -> Self {
        self.flag_empty_event_handlers = Some(enabled);
        self
    }

    /// Constructs the final Policy.
    /// Performs validation on the configured rules.
    pub fn build(self) -> SecurityResult<Policy> {
        let rounds = self.max_decode_rounds.unwrap_or(DEFAULT_MAX_DECODE_ROUNDS);
        if rounds == 0 {
            return Err(SecurityError::InvalidConfiguration(
                "max_decode_rounds must be at least 1".to_string(),
            ));
        }

        if self.dangerous_schemes.is_empty() {
            return Err(SecurityError::InvalidConfiguration(
                "at least one dangerous scheme is required".to_string(),
            ));
        }

        for (kind, set) in [
            ("tag", &self.disallowed_tags),
            ("attribute", &self.url_bearing_attributes),
            ("scheme", &self.dangerous_schemes),
            ("style token", &self.dangerous_style_tokens),
        ] {
            if set.iter().any(|entry| entry.is_empty()) {
                return Err(SecurityError::InvalidConfiguration(format!(
                    "empty {} name in policy",
                    kind
                )));
            }
        }

        if let Some(bad) = self
            .dangerous_schemes
            .iter()
            .find(|s| !s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-')))
        {
            return Err(SecurityError::InvalidConfiguration(format!(
                "scheme '{}' contains characters outside [a-z0-9+.-]",
                bad
            )));
        }

        Ok(Policy::from_parts(
            self.disallowed_tags,
            self.url_bearing_attributes,
            self.dangerous_schemes,
            self.dangerous_style_tokens,
            rounds,
            self.wide_text_scan.unwrap_or(false),
            self.flag_empty_event_handlers.unwrap_or(false),
        ))
    }
}

fn to_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().map(|s| s.as_ref().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_preset() {
        let policy = Policy::strict();
        for tag in ["script", "iframe", "embed", "object", "base"] {
            assert!(policy.is_disallowed_tag(tag), "{} should be disallowed", tag);
        }
        assert!(policy.is_disallowed_tag("SCRIPT"));
        assert!(!policy.is_disallowed_tag("svg"));
        assert!(!policy.wide_text_scan());
        assert!(!policy.flags_empty_event_handlers());
        assert_eq!(policy.max_decode_rounds(), DEFAULT_MAX_DECODE_ROUNDS);
    }

    #[test]
    fn test_wide_net_extends_strict() {
        let strict = Policy::strict();
        let wide = Policy::wide_net();
        for tag in strict.disallowed_tags() {
            assert!(wide.is_disallowed_tag(tag));
        }
        assert!(wide.is_disallowed_tag("svg"));
        assert!(wide.is_disallowed_tag("math"));
        assert!(wide.is_disallowed_tag("link"));
        assert!(wide.wide_text_scan());
        assert!(wide.flags_empty_event_handlers());
    }

    #[test]
    fn test_url_bearing_attributes() {
        let policy = Policy::strict();
        assert!(policy.is_url_bearing("href"));
        assert!(policy.is_url_bearing("XLINK:HREF"));
        assert!(policy.is_url_bearing("srcset"));
        assert!(!policy.is_url_bearing("title"));
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("strict".parse::<PolicyPreset>(), Ok(PolicyPreset::Strict));
        assert_eq!("Wide-Net".parse::<PolicyPreset>(), Ok(PolicyPreset::WideNet));
        assert_eq!(
            "lenient".parse::<PolicyPreset>(),
            Err(SecurityError::UnknownPreset {
                name: "lenient".to_string()
            })
        );
    }

    #[test]
    fn test_builder_normalizes_input() {
        let policy = PolicyBuilder::new()
            .disallow_tags(["  Frameset "])
            .dangerous_schemes(["JavaScript:", "livescript"])
            .build()
            .unwrap();
        assert!(policy.is_disallowed_tag("frameset"));
        assert!(policy.is_dangerous_scheme("javascript"));
        assert!(policy.is_dangerous_scheme("LiveScript"));
        assert_eq!(
            policy.find_scheme_token("x livescript:y"),
            Some((2, "livescript:"))
        );
    }

    #[test]
    fn test_builder_from_preset_permits_tags() {
        let policy = PolicyBuilder::from_preset(PolicyPreset::WideNet)
            .permit_tags(["svg"])
            .build()
            .unwrap();
        assert!(!policy.is_disallowed_tag("svg"));
        assert!(policy.is_disallowed_tag("math"));
        assert!(policy.wide_text_scan());
    }

    #[test]
    fn test_builder_rejects_invalid_rules() {
        assert!(matches!(
            PolicyBuilder::from_preset(PolicyPreset::Strict).max_decode_rounds(0).build(),
            Err(SecurityError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            PolicyBuilder::new().build(),
            Err(SecurityError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            PolicyBuilder::new().dangerous_schemes(["java script"]).build(),
            Err(SecurityError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            PolicyBuilder::new().dangerous_schemes(["javascript"]).disallow_tags([""]).build(),
            Err(SecurityError::InvalidConfiguration(_))
        ));
    }
}
