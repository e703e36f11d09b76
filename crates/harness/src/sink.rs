//! Destinations for audit results.
//!
//! A fuzzing run must never stop on a finding, so sinks persist what they
//! are given and return. [`DirectorySink`] keeps one bundle of files per
//! finding, an append-only index, a deduplicated lead log and a capped set
//! of parser-failure inputs.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::config::HarnessConfig;
use crate::driver::AuditOutcome;
use crate::error::HarnessResult;

pub const INDEX_FILE: &str = "index.txt";
pub const LEAD_LOG_FILE: &str = "ignored_leads.log";

/// Bytes of the SHA-256 digest kept in short hashes
const SHORT_HASH_BYTES: usize = 6;

/// Receives audit outcomes and parser failures.
pub trait FindingSink: Send + Sync {
    /// Keep an outcome that has findings or leads
    fn record(&self, outcome: &AuditOutcome) -> HarnessResult<()>;

    /// Keep an input the parser or sanitizer failed on
    fn record_parser_failure(&self, input: &str, error: &str) -> HarnessResult<()>;
}

/// Hex prefix of the SHA-256 digest of `text`.
pub fn short_hash(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .take(SHORT_HASH_BYTES)
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Collects everything in memory. Used by tests and embedding callers.
#[derive(Debug, Default)]
pub struct MemorySink {
    outcomes: Mutex<Vec<AuditOutcome>>,
    failures: Mutex<Vec<(String, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<AuditOutcome> {
        self.outcomes.lock().clone()
    }

    /// Recorded outcomes that carry at least one finding
    pub fn findings_count(&self) -> usize {
        self.outcomes.lock().iter().filter(|o| !o.is_safe()).count()
    }

    /// `(input, error)` pairs
    pub fn failures(&self) -> Vec<(String, String)> {
        self.failures.lock().clone()
    }

    pub fn clear(&self) {
        self.outcomes.lock().clear();
        self.failures.lock().clear();
    }
}

impl FindingSink for MemorySink {
    fn record(&self, outcome: &AuditOutcome) -> HarnessResult<()> {
        self.outcomes.lock().push(outcome.clone());
        Ok(())
    }

    fn record_parser_failure(&self, input: &str, error: &str) -> HarnessResult<()> {
        self.failures.lock().push((input.to_string(), error.to_string()));
        Ok(())
    }
}

/// Reports through the `log` facade: findings at `warn`, leads at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl FindingSink for LogSink {
    fn record(&self, outcome: &AuditOutcome) -> HarnessResult<()> {
        for finding in outcome.verdict.findings() {
            log::warn!("[FINDING] {} <- {:?}", finding, outcome.raw);
        }
        for lead in outcome.verdict.leads() {
            log::info!(
                "[LEAD] {:?} at {}: {:?}",
                lead.kind,
                lead.location,
                lead.evidence.raw
            );
        }
        Ok(())
    }

    fn record_parser_failure(&self, input: &str, error: &str) -> HarnessResult<()> {
        log::error!("[PARSER FAILURE] {} <- {:?}", error, input);
        Ok(())
    }
}

/// Writes findings, leads and parser failures to disk.
///
/// Findings go to `findings_dir` as `<timestamp>_<hash>.raw`, `.clean.txt`,
/// `.dom.txt` and `.verdict.json`, with one line appended to `index.txt`.
/// Leads are appended to `artifacts_dir/ignored_leads.log` once per hash of
/// the offending value. Parser failures are kept in `artifacts_dir` once per
/// input hash, oldest first out beyond the configured cap.
#[derive(Debug)]
pub struct DirectorySink {
    findings_dir: PathBuf,
    artifacts_dir: PathBuf,
    max_parser_artifacts: usize,
    lock: Mutex<()>,
}

impl DirectorySink {
    pub fn new(
        findings_dir: impl Into<PathBuf>,
        artifacts_dir: impl Into<PathBuf>,
        max_parser_artifacts: usize,
    ) -> Self {
        Self {
            findings_dir: findings_dir.into(),
            artifacts_dir: artifacts_dir.into(),
            max_parser_artifacts,
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            &config.findings_dir,
            &config.artifacts_dir,
            config.max_parser_artifacts,
        )
    }

    pub fn findings_dir(&self) -> &Path {
        &self.findings_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Writes one finding bundle and returns its base name
    fn save_finding(&self, outcome: &AuditOutcome) -> HarnessResult<String> {
        fs::create_dir_all(&self.findings_dir)?;
        let now = Utc::now();
        let hash = short_hash(&outcome.raw);
        let base = format!("{}_{}", now.format("%Y-%m-%dT%H-%M-%S%.3fZ"), hash);

        let bundle = [
            ("raw", outcome.raw.clone()),
            ("clean.txt", outcome.cleaned.clone()),
            ("dom.txt", outcome.dom_dump.clone()),
            ("verdict.json", outcome.verdict.to_json()?),
        ];
        for (extension, content) in bundle {
            fs::write(self.findings_dir.join(format!("{}.{}", base, extension)), content)?;
        }

        let reasons: Vec<&str> = outcome
            .verdict
            .reasons()
            .into_iter()
            .map(|reason| reason.as_str())
            .collect();
        let line = format!(
            "{} | {} | {} | {}\n",
            now.to_rfc3339(),
            hash,
            reasons.join(","),
            base
        );
        append(&self.findings_dir.join(INDEX_FILE), &line)?;
        tracing::info!("Finding saved: {} -> {}", reasons.join(","), base);
        Ok(base)
    }

    fn log_leads(&self, outcome: &AuditOutcome) -> HarnessResult<()> {
        if outcome.verdict.leads().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.artifacts_dir)?;
        let path = self.artifacts_dir.join(LEAD_LOG_FILE);
        let mut seen = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        for lead in outcome.verdict.leads() {
            let key = short_hash(&lead.value);
            if seen.contains(&format!("| {} |", key)) {
                continue;
            }
            let line = format!(
                "{} | {} | {} | {:?} | {:?}\n",
                Utc::now().to_rfc3339(),
                key,
                lead.location,
                lead.evidence.raw,
                outcome.cleaned
            );
            append(&path, &line)?;
            seen.push_str(&line);
        }
        Ok(())
    }

    /// Deletes the oldest parser-failure inputs beyond the cap
    fn enforce_artifact_cap(&self) -> HarnessResult<()> {
        let mut raws: Vec<PathBuf> = fs::read_dir(&self.artifacts_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_parser_failure_raw(path))
            .collect();
        if raws.len() <= self.max_parser_artifacts {
            return Ok(());
        }
        // Names start with a fixed-width millisecond timestamp
        raws.sort();
        let excess = raws.len() - self.max_parser_artifacts;
        for raw in raws.into_iter().take(excess) {
            let error_file = raw.with_extension("error.txt");
            if let Err(err) = fs::remove_file(&raw) {
                tracing::warn!("Could not remove {}: {}", raw.display(), err);
            }
            let _ = fs::remove_file(error_file);
        }
        Ok(())
    }
}

impl FindingSink for DirectorySink {
    fn record(&self, outcome: &AuditOutcome) -> HarnessResult<()> {
        let _guard = self.lock.lock();
        if !outcome.is_safe() {
            self.save_finding(outcome)?;
        }
        self.log_leads(outcome)
    }

    fn record_parser_failure(&self, input: &str, error: &str) -> HarnessResult<()> {
        let _guard = self.lock.lock();
        fs::create_dir_all(&self.artifacts_dir)?;
        let hash = short_hash(input);
        let suffix = format!("_{}.raw", hash);
        let already_saved = fs::read_dir(&self.artifacts_dir)?
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name().to_string_lossy().ends_with(&suffix));
        if already_saved {
            tracing::debug!("Parser failure {} already saved", hash);
            return Ok(());
        }

        let base = format!("parser_failure_{:013}_{}", Utc::now().timestamp_millis(), hash);
        fs::write(self.artifacts_dir.join(format!("{}.raw", base)), input)?;
        fs::write(self.artifacts_dir.join(format!("{}.error.txt", base)), error)?;
        tracing::info!("Parser failure saved: {}", base);
        self.enforce_artifact_cap()
    }
}

fn is_parser_failure_raw(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("parser_failure_") && name.ends_with(".raw"))
}

fn append(path: &Path, line: &str) -> HarnessResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}
