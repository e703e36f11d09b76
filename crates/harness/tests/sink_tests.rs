use std::fs;
use std::path::Path;

use citadel_harness::{
    short_hash, AuditOutcome, DirectorySink, Driver, FindingSink, HarnessConfig, MemorySink,
};
use citadel_parser::AllowPolicy;
use citadel_security::PolicyPreset;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// A driver whose allow-list lets event handlers and fragment links through.
fn leaky_driver() -> Driver {
    let config = HarnessConfig {
        preserve_relative_links: true,
        ..Default::default()
    };
    Driver::new(config)
        .unwrap()
        .with_allow_policy(
            AllowPolicy::relaxed()
                .preserve_relative_links(true)
                .add_attributes("img", ["onerror"]),
        )
        .unwrap()
}

fn finding_outcome(driver: &Driver) -> AuditOutcome {
    let outcome = driver.run("<img src=x onerror=alert(1)>").unwrap();
    assert!(!outcome.is_safe());
    outcome
}

fn lead_outcome(driver: &Driver, fragment: &str) -> AuditOutcome {
    let outcome = driver
        .run(&format!("<a href=\"/p#javascript:{}\">x</a>", fragment))
        .unwrap();
    assert!(outcome.is_safe());
    assert_eq!(outcome.verdict.leads().len(), 1);
    outcome
}

fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(suffix))
        .collect();
    names.sort();
    names
}

fn sink_in(dir: &TempDir, cap: usize) -> DirectorySink {
    DirectorySink::new(dir.path().join("findings"), dir.path().join("artifacts"), cap)
}

#[test]
fn test_finding_bundle_is_written() {
    let dir = TempDir::new().unwrap();
    let sink = sink_in(&dir, 100);
    let outcome = finding_outcome(&leaky_driver());
    sink.record(&outcome).unwrap();

    let findings = sink.findings_dir();
    let raws = files_with_suffix(findings, ".raw");
    assert_eq!(raws.len(), 1);
    let base = raws[0].trim_end_matches(".raw");
    assert!(base.ends_with(&short_hash(&outcome.raw)));

    assert_eq!(
        fs::read_to_string(findings.join(format!("{}.raw", base))).unwrap(),
        outcome.raw
    );
    assert_eq!(
        fs::read_to_string(findings.join(format!("{}.clean.txt", base))).unwrap(),
        outcome.cleaned
    );
    assert!(fs::read_to_string(findings.join(format!("{}.dom.txt", base)))
        .unwrap()
        .contains("onerror = \"alert(1)\""));

    let verdict: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(findings.join(format!("{}.verdict.json", base))).unwrap(),
    )
    .unwrap();
    assert_eq!(verdict["safe"], false);
    assert_eq!(verdict["findings"][0]["reason"], "EVENT_HANDLER_SURVIVED");

    let index = fs::read_to_string(findings.join("index.txt")).unwrap();
    assert_eq!(index.lines().count(), 1);
    assert!(index.contains("| EVENT_HANDLER_SURVIVED |"));
    assert!(index.trim_end().ends_with(base));
}

#[test]
fn test_leads_are_deduplicated() {
    let dir = TempDir::new().unwrap();
    let sink = sink_in(&dir, 100);
    let driver = leaky_driver();

    sink.record(&lead_outcome(&driver, "a")).unwrap();
    sink.record(&lead_outcome(&driver, "a")).unwrap();
    sink.record(&lead_outcome(&driver, "b")).unwrap();

    let log = fs::read_to_string(sink.artifacts_dir().join("ignored_leads.log")).unwrap();
    assert_eq!(log.lines().count(), 2);
    assert!(log.contains(&short_hash("/p#javascript:a")));
    // Leads alone never produce finding bundles.
    assert!(!sink.findings_dir().exists());
}

#[test]
fn test_long_leads_sharing_a_prefix_are_distinct() {
    let dir = TempDir::new().unwrap();
    let sink = sink_in(&dir, 100);
    let driver = leaky_driver();
    let prefix = "y".repeat(200);

    sink.record(&lead_outcome(&driver, &format!("{}1", prefix))).unwrap();
    sink.record(&lead_outcome(&driver, &format!("{}2", prefix))).unwrap();
    sink.record(&lead_outcome(&driver, &format!("{}2", prefix))).unwrap();

    let log = fs::read_to_string(sink.artifacts_dir().join("ignored_leads.log")).unwrap();
    assert_eq!(log.lines().count(), 2);
}

#[test]
fn test_parser_failures_are_deduplicated_and_capped() {
    let dir = TempDir::new().unwrap();
    let sink = sink_in(&dir, 2);

    sink.record_parser_failure("first", "boom").unwrap();
    sink.record_parser_failure("first", "boom").unwrap();
    assert_eq!(files_with_suffix(sink.artifacts_dir(), ".raw").len(), 1);

    sink.record_parser_failure("second", "boom").unwrap();
    sink.record_parser_failure("third", "boom").unwrap();
    let raws = files_with_suffix(sink.artifacts_dir(), ".raw");
    assert_eq!(raws.len(), 2);
    assert_eq!(files_with_suffix(sink.artifacts_dir(), ".error.txt").len(), 2);
    assert!(raws.iter().all(|name| name.starts_with("parser_failure_")));
}

#[test]
fn test_memory_sink_collects_through_driver() {
    let sink = MemorySink::new();
    let driver = leaky_driver();

    driver.run_and_record("<img src=x onerror=alert(1)>", &sink);
    driver.run_and_record("<p>fine</p>", &sink);
    driver.run_and_record("<a href=\"/p#javascript:x\">x</a>", &sink);

    // The clean paragraph is neither a finding nor a lead.
    assert_eq!(sink.outcomes().len(), 2);
    assert_eq!(sink.findings_count(), 1);
    assert!(sink.failures().is_empty());

    sink.clear();
    assert!(sink.outcomes().is_empty());
}

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.json");
    let config = HarnessConfig {
        classifier_preset: PolicyPreset::WideNet,
        findings_dir: dir.path().join("out"),
        max_parser_artifacts: 7,
        ..Default::default()
    };
    config.save(&path).unwrap();
    assert_eq!(HarnessConfig::load(&path).unwrap(), config);

    let sink = DirectorySink::from_config(&config);
    assert_eq!(sink.findings_dir(), dir.path().join("out"));
}

#[test]
fn test_bad_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.json");
    fs::write(&path, r#"{"classifier_preset": "lenient"}"#).unwrap();
    assert!(HarnessConfig::load(&path).is_err());
    assert!(HarnessConfig::load(&dir.path().join("missing.json")).is_err());
}
