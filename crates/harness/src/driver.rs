//! Clean, re-parse and classify.
//!
//! The driver owns one configuration's worth of sanitizer, parser and
//! classifier policy. Every input goes through the same steps: shape it into
//! a document, clean it, parse the cleaned output and classify the tree and
//! the cleaned text. Panics inside the parser or sanitizer are caught and
//! reported as parser failures so a long fuzzing run keeps going.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use citadel_parser::{AllowPolicy, HtmlParser, ParserError, Sanitizer};
use citadel_security::{Classifier, Policy, Verdict};
use serde::Serialize;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::input::{candidate_documents, shape_payload};
use crate::sink::FindingSink;

/// Everything known about one cleaned document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditOutcome {
    /// The input as received
    pub raw: String,
    /// The document handed to the sanitizer
    pub document: String,
    pub cleaned: String,
    pub verdict: Verdict,
    /// Outline of the cleaned document's element tree
    pub dom_dump: String,
}

impl AuditOutcome {
    pub fn is_safe(&self) -> bool {
        self.verdict.is_safe()
    }

    /// True if a sink has anything to keep for this outcome
    pub fn is_notable(&self) -> bool {
        !self.verdict.is_safe() || !self.verdict.leads().is_empty()
    }
}

pub struct Driver {
    config: HarnessConfig,
    policy: Policy,
    parser: HtmlParser,
    sanitizer: Sanitizer,
    /// Same allow-list with relative-link handling flipped
    alternate: Sanitizer,
}

impl Driver {
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        let allow = config.allow_policy();
        let preserve = allow.preserves_relative_links();
        Ok(Self {
            policy: config.policy(),
            parser: HtmlParser::default(),
            sanitizer: Sanitizer::new(allow.clone())?,
            alternate: Sanitizer::new(allow.preserve_relative_links(!preserve))?,
            config,
        })
    }

    /// Replace the configured classifier policy, e.g. with a custom build
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the configured allow-list
    pub fn with_allow_policy(mut self, allow: AllowPolicy) -> HarnessResult<Self> {
        let preserve = allow.preserves_relative_links();
        self.alternate = Sanitizer::new(allow.clone().preserve_relative_links(!preserve))?;
        self.sanitizer = Sanitizer::new(allow)?;
        Ok(self)
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn parser(&self) -> &HtmlParser {
        &self.parser
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Shape, clean and classify one input
    pub fn run(&self, raw: &str) -> HarnessResult<AuditOutcome> {
        self.check_length(raw)?;
        let document = shape_payload(raw, self.config.payload_shape);
        self.audit_document(raw, document, &self.sanitizer)
    }

    /// Run every candidate document for `payload` through both
    /// relative-link settings. Candidate order is preserved, with the
    /// configured setting first for each candidate.
    pub fn run_candidates(&self, payload: &str) -> HarnessResult<Vec<AuditOutcome>> {
        self.check_length(payload)?;
        let mut outcomes = Vec::new();
        for document in candidate_documents(payload) {
            for sanitizer in [&self.sanitizer, &self.alternate] {
                outcomes.push(self.audit_document(payload, document.clone(), sanitizer)?);
            }
        }
        Ok(outcomes)
    }

    /// Like [`Driver::run`], but hands the result to `sink` instead of
    /// failing. Oversized inputs are skipped; sink errors are logged.
    ///
    /// Sanitizer panics are only recorded when they unwind. A panic hook that
    /// aborts the process, such as the one libfuzzer installs, still aborts.
    pub fn run_and_record(&self, raw: &str, sink: &dyn FindingSink) -> Option<AuditOutcome> {
        match self.run(raw) {
            Ok(outcome) => {
                record(sink, &outcome);
                Some(outcome)
            }
            Err(HarnessError::Parser(ParserError::InputTooLarge { len, limit })) => {
                tracing::debug!("Skipping input of {} bytes (limit {})", len, limit);
                None
            }
            Err(err) => {
                tracing::warn!("Parser failure: {}", err);
                if let Err(sink_err) = sink.record_parser_failure(raw, &err.to_string()) {
                    tracing::error!("Failed to record parser failure: {}", sink_err);
                }
                None
            }
        }
    }

    fn check_length(&self, raw: &str) -> HarnessResult<()> {
        if raw.len() > self.config.max_input_len {
            return Err(ParserError::InputTooLarge {
                len: raw.len(),
                limit: self.config.max_input_len,
            }
            .into());
        }
        Ok(())
    }

    fn audit_document(
        &self,
        raw: &str,
        document: String,
        sanitizer: &Sanitizer,
    ) -> HarnessResult<AuditOutcome> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let cleaned = sanitizer.clean(&document);
            let root = self.parser.parse_document(&cleaned)?;
            let verdict = Classifier::new(&self.policy, &self.parser).classify_markup(&cleaned, &root);
            Ok::<_, HarnessError>((cleaned, verdict, root.outline()))
        }));
        let (cleaned, verdict, dom_dump) = match result {
            Ok(audited) => audited?,
            Err(payload) => {
                return Err(ParserError::HtmlParseError(format!(
                    "panic while cleaning: {}",
                    panic_message(payload.as_ref())
                ))
                .into())
            }
        };

        if !verdict.is_safe() {
            tracing::info!(
                "{} finding(s) in cleaned output {:?}",
                verdict.findings().len(),
                cleaned
            );
        }
        Ok(AuditOutcome {
            raw: raw.to_string(),
            document,
            cleaned,
            verdict,
            dom_dump,
        })
    }
}

/// Hands a notable outcome to the sink, logging rather than propagating
/// sink errors.
pub fn record(sink: &dyn FindingSink, outcome: &AuditOutcome) {
    if !outcome.is_notable() {
        return;
    }
    if let Err(err) = sink.record(outcome) {
        tracing::error!("Failed to record outcome: {}", err);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Totals from cleaning a file line by line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineReport {
    pub lines: usize,
    /// Lines whose cleaned output changes when cleaned again
    pub unstable: usize,
    pub cleaned: Vec<String>,
}

/// The allow-list used for cleaning corpus files line by line: relaxed,
/// relative links kept, plus form and media elements.
pub fn line_cleaning_policy() -> AllowPolicy {
    AllowPolicy::relaxed()
        .preserve_relative_links(true)
        .base_url(Some("https://example.com/"))
        .add_tags(["input", "button", "form", "video", "div", "dialog", "track", "select"])
        .add_attributes("blockquote", ["cite"])
        .add_attributes("q", ["cite"])
        .add_attributes("video", ["poster"])
}

/// Cleans every line of `input` and counts lines that are not stable under
/// a second cleaning.
pub fn clean_lines(sanitizer: &Sanitizer, input: &str) -> LineReport {
    let mut report = LineReport::default();
    for line in input.lines() {
        report.lines += 1;
        let cleaned = sanitizer.clean(line);
        if sanitizer.clean(&cleaned) != cleaned {
            tracing::debug!("Line {} is unstable under re-cleaning", report.lines);
            report.unstable += 1;
        }
        report.cleaned.push(cleaned);
    }
    report
}
