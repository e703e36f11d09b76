//! Walks a sanitized tree and reports everything that can still run script.

use crate::node::SanitizedNode;
use crate::normalizer::{EntityDecoder, NormalizedValue, Normalizer};
use crate::policy::Policy;
use crate::scheme::{data_uri_is_executable, extract_scheme, looks_dangerous, protocol_relative_scheme};
use crate::verdict::{Evidence, Finding, Lead, LeadKind, Location, ReasonCode, Verdict};

/// Applies one [`Policy`] to sanitized trees.
///
/// Holds only shared borrows, so one classifier can serve any number of
/// threads as long as each call gets its own tree.
pub struct Classifier<'a> {
    policy: &'a Policy,
    normalizer: Normalizer<'a>,
}

/// Findings and leads collected during one walk.
#[derive(Default)]
struct Report {
    findings: Vec<Finding>,
    leads: Vec<Lead>,
}

impl Report {
    fn finding(&mut self, reason: ReasonCode, location: Location, raw: &str, normalized: &str) {
        log::debug!("{} at {}", reason, location);
        self.findings.push(Finding {
            reason,
            location,
            evidence: Evidence::new(raw, normalized),
        });
    }

    fn lead(&mut self, kind: LeadKind, location: Location, raw: &str, normalized: &str) {
        log::trace!("lead {:?} at {}", kind, location);
        self.leads.push(Lead::new(kind, location, raw, normalized));
    }
}

impl<'a> Classifier<'a> {
    pub fn new(policy: &'a Policy, decoder: &'a dyn EntityDecoder) -> Self {
        Self {
            policy,
            normalizer: Normalizer::new(decoder, policy.max_decode_rounds()),
        }
    }

    pub fn policy(&self) -> &Policy {
        self.policy
    }

    pub fn normalizer(&self) -> &Normalizer<'a> {
        &self.normalizer
    }

    /// Classifies every node of `root` in pre-order.
    pub fn classify(&self, root: &SanitizedNode) -> Verdict {
        let mut report = Report::default();
        for node in root.descendants() {
            self.inspect_node(node, &mut report);
        }
        Verdict::new(report.findings, report.leads)
    }

    /// Like [`classify`](Self::classify), and with a wide-net policy also
    /// scans `markup` (the cleaned document text) for danger markers. A text
    /// match becomes a lead, since escaped text matches as readily as live markup.
    pub fn classify_markup(&self, markup: &str, root: &SanitizedNode) -> Verdict {
        let mut verdict = self.classify(root);
        if self.policy.wide_text_scan() {
            let normalized = self.normalizer.normalize(markup);
            if looks_dangerous(&normalized) {
                verdict.push_lead(Lead::new(
                    LeadKind::DocumentText,
                    Location::element(root.tag()),
                    markup,
                    &normalized,
                ));
            }
        }
        verdict
    }

    fn inspect_node(&self, node: &SanitizedNode, report: &mut Report) {
        if self.policy.is_disallowed_tag(node.tag()) {
            report.finding(
                ReasonCode::DisallowedTagSurvived,
                Location::element(node.tag()),
                node.tag(),
                &node.tag().to_lowercase(),
            );
        }
        for (key, raw) in node.attributes() {
            self.inspect_attribute(node.tag(), key, raw, report);
        }
    }

    fn inspect_attribute(&self, tag: &str, key: &str, raw: &str, report: &mut Report) {
        let key = key.to_lowercase();
        let value = self.normalizer.canonicalize(raw);
        let location = || Location::attribute(tag, &key);
        let found_before = report.findings.len();

        if key.starts_with("on") && (!value.is_empty() || self.policy.flags_empty_event_handlers()) {
            report.finding(ReasonCode::EventHandlerSurvived, location(), raw, value.as_str());
        }

        if key == "style" {
            if let Some(token) = self.unsafe_style_token(value.as_str()) {
                log::trace!("style token {:?} in {}", token, location());
                report.finding(ReasonCode::UnsafeStyleSurvived, location(), raw, value.as_str());
            }
        }

        let flagged = report.findings.len() > found_before;
        if key == "srcset" {
            for candidate in srcset_candidates(value.case_preserved()) {
                let candidate = self.normalizer.canonicalize(candidate);
                self.inspect_url(&location(), raw, &candidate, flagged, report);
            }
        } else if self.policy.is_url_bearing(&key) || looks_url_like(value.as_str()) {
            self.inspect_url(&location(), raw, &value, flagged, report);
        }
    }

    /// Checks one URL value. Leads are only recorded when the attribute has
    /// not already produced a finding.
    fn inspect_url(
        &self,
        location: &Location,
        raw: &str,
        value: &NormalizedValue,
        flagged: bool,
        report: &mut Report,
    ) {
        let text = value.as_str();
        if text.is_empty() {
            return;
        }

        if protocol_relative_scheme(text, self.policy).is_some() {
            report.finding(ReasonCode::DangerousSchemeSurvived, location.clone(), raw, text);
            return;
        }

        if let Some(kind) = non_actionable_placement(text) {
            if !flagged && self.policy.find_scheme_token(text).is_some() {
                report.lead(kind, location.clone(), raw, text);
            }
            return;
        }

        match extract_scheme(text) {
            Some(scheme) if self.policy.is_dangerous_scheme(&scheme) => {
                report.finding(ReasonCode::DangerousSchemeSurvived, location.clone(), raw, text);
            }
            Some(scheme) if scheme == "data" => {
                if data_uri_is_executable(value.case_preserved(), &self.normalizer) {
                    report.finding(ReasonCode::DangerousDataUriSurvived, location.clone(), raw, text);
                }
            }
            Some(_) => {
                if !flagged && self.policy.find_scheme_token(text).is_some() {
                    report.lead(LeadKind::EmbeddedSchemeToken, location.clone(), raw, text);
                }
            }
            None => {
                if self.policy.find_scheme_token(text).is_some() {
                    report.finding(ReasonCode::DangerousSchemeSurvived, location.clone(), raw, text);
                }
            }
        }
    }

    fn unsafe_style_token(&self, text: &str) -> Option<&str> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        self.policy
            .dangerous_style_tokens()
            .find(|token| text.contains(token) || compact.contains(token))
    }
}

/// Classifies `root` with a throwaway [`Classifier`].
pub fn classify(root: &SanitizedNode, policy: &Policy, decoder: &dyn EntityDecoder) -> Verdict {
    Classifier::new(policy, decoder).classify(root)
}

/// A value is treated as a URL when it has a colon or a percent sign, or
/// starts like a `data:` or `javascript:` URL.
pub fn looks_url_like(normalized: &str) -> bool {
    normalized.contains(':')
        || normalized.contains('%')
        || normalized.starts_with("data")
        || normalized.starts_with("javascript")
}

/// Fragment-only and relative-path values cannot navigate to a scheme.
/// A `#` before the first `:` puts any scheme token inside the fragment.
fn non_actionable_placement(text: &str) -> Option<LeadKind> {
    let colon = text.find(':');
    let hash = text.find('#');
    if text.starts_with('#') || matches!((hash, colon), (Some(h), Some(c)) if h < c) {
        return Some(LeadKind::FragmentScheme);
    }
    if text.starts_with('/') && !text.starts_with("//") {
        return Some(LeadKind::RelativePathScheme);
    }
    None
}

/// URL of each comma-separated srcset candidate: the text before its first
/// whitespace. A `data:` URL keeps the segments that follow it, up to the
/// next whitespace, since its payload comes after a comma.
fn srcset_candidates(value: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut rest = value.trim_start();
    while !rest.is_empty() {
        let is_data = rest
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"));
        let end = if is_data {
            rest.find(char::is_whitespace).unwrap_or(rest.len())
        } else {
            rest.find(|c: char| c == ',' || c.is_whitespace()).unwrap_or(rest.len())
        };
        let url = rest[..end].trim_end_matches(',');
        if !url.is_empty() {
            candidates.push(url);
        }
        rest = match rest[end..].find(',') {
            Some(comma) => rest[end + comma + 1..].trim_start(),
            None => "",
        };
    }
    candidates
}
