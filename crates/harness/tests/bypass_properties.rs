//! End-to-end detection properties, with markup parsed and entities decoded
//! by the real HTML parser.

use citadel_harness::{Driver, HarnessConfig, MemorySink, PayloadShape};
use citadel_parser::{AllowPolicy, HtmlParser};
use citadel_security::{Classifier, LeadKind, Normalizer, Policy, PolicyPreset, ReasonCode, Verdict};
use pretty_assertions::assert_eq;

fn classify_with(markup: &str, policy: &Policy) -> Verdict {
    let parser = HtmlParser::default();
    let root = parser.parse_fragment(markup).unwrap();
    Classifier::new(policy, &parser).classify_markup(markup, &root)
}

fn classify(markup: &str) -> Verdict {
    classify_with(markup, &Policy::strict())
}

fn locations(verdict: &Verdict) -> Vec<String> {
    verdict
        .findings()
        .iter()
        .map(|f| f.location.to_string())
        .collect()
}

#[test]
fn mixed_case_scheme_with_leading_space() {
    let verdict = classify(r#"<a href="  JaVaScRiPt:alert(1)">x</a>"#);
    assert_eq!(verdict.reasons(), vec![ReasonCode::DangerousSchemeSurvived]);
    assert_eq!(verdict.findings()[0].evidence.normalized, "javascript:alert(1)");
}

#[test]
fn double_encoded_entity_in_href() {
    // The parser leaves `&#x6a;` in the tree; the classifier decodes it.
    let verdict = classify(r#"<a href="&amp;#x6a;avascript:alert(1)">x</a>"#);
    assert_eq!(verdict.reasons(), vec![ReasonCode::DangerousSchemeSurvived]);
    assert_eq!(verdict.findings()[0].evidence.raw, "&#x6a;avascript:alert(1)");
}

#[test]
fn event_handler_reported_once() {
    let verdict = classify(r#"<img onerror="alert(1)">"#);
    assert_eq!(verdict.findings().len(), 1);
    assert_eq!(locations(&verdict), vec!["img.onerror"]);
    assert_eq!(verdict.reasons(), vec![ReasonCode::EventHandlerSurvived]);
}

#[test]
fn base64_html_data_uri() {
    let verdict = classify(
        r#"<a href="data:text/html;base64,PHNjcmlwdD5hbGVydCgxKTwvc2NyaXB0Pg==">x</a>"#,
    );
    assert_eq!(verdict.reasons(), vec![ReasonCode::DangerousDataUriSurvived]);
}

#[test]
fn image_data_uri_is_benign() {
    let verdict = classify(r#"<img src="data:image/png;base64,iVBORw0KGgo=">"#);
    assert!(verdict.is_safe());
}

#[test]
fn scheme_token_in_fragment_is_a_lead() {
    let verdict = classify(r#"<a href="/path#javascript:x">x</a>"#);
    assert!(verdict.is_safe());
    assert!(!verdict.has_reason(ReasonCode::DangerousSchemeSurvived));
    assert_eq!(verdict.leads().len(), 1);
    assert_eq!(verdict.leads()[0].kind, LeadKind::FragmentScheme);
}

#[test]
fn spaced_style_url() {
    let verdict = classify(r#"<div style="background:url(  javascript:alert(1)  )">x</div>"#);
    assert_eq!(verdict.reasons(), vec![ReasonCode::UnsafeStyleSurvived]);
    assert_eq!(locations(&verdict), vec!["div.style"]);
}

#[test]
fn benign_markup_is_safe() {
    let verdict = classify(
        r#"<p class="intro"><a href="https://example.com/a?b=c#d" title="t">link</a><img src="/logo.png" alt="logo"></p>"#,
    );
    assert!(verdict.is_safe());
    assert!(verdict.findings().is_empty());
    assert!(verdict.leads().is_empty());
}

#[test]
fn protocol_relative_scheme() {
    let verdict = classify(r#"<a href="//javascript:alert(1)">x</a>"#);
    assert_eq!(verdict.reasons(), vec![ReasonCode::DangerousSchemeSurvived]);
}

#[test]
fn fullwidth_colon_folds_to_ascii() {
    let verdict = classify("<a href=\"javascript\u{FF1A}alert(1)\">x</a>");
    assert_eq!(verdict.reasons(), vec![ReasonCode::DangerousSchemeSurvived]);
}

#[test]
fn double_percent_encoding() {
    let verdict = classify(r#"<a href="javascript%253Aalert(1)">x</a>"#);
    assert_eq!(verdict.reasons(), vec![ReasonCode::DangerousSchemeSurvived]);
    assert_eq!(verdict.findings()[0].evidence.normalized, "javascript:alert(1)");
}

#[test]
fn invisible_and_bidi_characters() {
    for markup in [
        "<a href=\"java\u{200B}script:alert(1)\">x</a>",
        "<a href=\"&#8238;javascript:alert(1)\">x</a>",
        "<a href=\"jav&#x09;ascript:alert(1)\">x</a>",
        "<a href=\"\u{FEFF}javascript:alert(1)\">x</a>",
    ] {
        let verdict = classify(markup);
        assert!(
            verdict.has_reason(ReasonCode::DangerousSchemeSurvived),
            "missed {:?}",
            markup
        );
    }
}

#[test]
fn malformed_data_uris_do_not_panic() {
    for markup in [
        r#"<a href="data:text/html;base64,!!!">x</a>"#,
        r#"<a href="data:text/html;base64">x</a>"#,
        r#"<a href="data:">x</a>"#,
        r#"<a href="data:text/html,%E0%A4%A">x</a>"#,
    ] {
        let _ = classify(markup);
    }
}

#[test]
fn srcset_candidate_with_scheme() {
    let verdict = classify(r#"<img srcset="/a.png 1x, javascript:alert(1) 2x">"#);
    assert_eq!(verdict.reasons(), vec![ReasonCode::DangerousSchemeSurvived]);
    assert_eq!(locations(&verdict), vec!["img.srcset"]);
}

#[test]
fn classification_is_deterministic_and_non_mutating() {
    let parser = HtmlParser::default();
    let markup = r#"<div onclick="x()"><a href="javascript:1">a</a><svg><a xlink:href="vbscript:2"></a></svg></div>"#;
    let root = parser.parse_fragment(markup).unwrap();
    let before = root.clone();
    let policy = Policy::wide_net();
    let classifier = Classifier::new(&policy, &parser);

    let first = classifier.classify(&root);
    let second = classifier.classify(&root);
    assert_eq!(first, second);
    assert_eq!(root, before);
    assert_eq!(
        locations(&first),
        vec!["div.onclick", "a.href", "svg", "a.xlink:href"]
    );
}

#[test]
fn wide_net_text_scan_is_a_lead() {
    let markup = "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>";
    let verdict = classify_with(markup, &PolicyPreset::WideNet.policy());
    assert!(verdict.is_safe());
    assert!(verdict
        .leads()
        .iter()
        .any(|lead| lead.kind == LeadKind::DocumentText));

    let strict = classify(markup);
    assert!(strict.leads().is_empty());
}

#[test]
fn relaxed_cleaning_removes_vectors() {
    let driver = Driver::new(HarnessConfig {
        payload_shape: PayloadShape::AnchorHref,
        ..Default::default()
    })
    .unwrap();
    let sink = MemorySink::new();
    for input in [
        "<script>alert(1)</script>",
        "<img src=x onerror=alert(1)>",
        "javascript:alert(1)",
        "&#x6a;avascript:alert(1)",
        "<svg><a xlink:href=\"javascript:alert(1)\">x</a></svg>",
        "<div style=\"background:url(javascript:alert(1))\">x</div>",
    ] {
        let outcome = driver.run_and_record(input, &sink).unwrap();
        assert!(outcome.is_safe(), "bypass via {:?}: {}", input, outcome.cleaned);
    }
    assert_eq!(sink.findings_count(), 0);
}

#[test]
fn permissive_allow_list_is_caught() {
    let driver = Driver::new(HarnessConfig::default())
        .unwrap()
        .with_allow_policy(
            AllowPolicy::relaxed()
                .add_tags(["iframe"])
                .add_attributes("iframe", ["src"])
                .add_protocols(["data"]),
        )
        .unwrap();
    let outcome = driver
        .run("<iframe src=\"data:text/html;base64,PHN2ZyBvbmxvYWQ9YWxlcnQoMSk+\"></iframe>")
        .unwrap();
    assert_eq!(
        outcome.verdict.reasons(),
        vec![
            ReasonCode::DisallowedTagSurvived,
            ReasonCode::DangerousDataUriSurvived
        ]
    );
}

#[test]
fn deeply_layered_values_settle_in_one_call() {
    let parser = HtmlParser::default();
    let normalizer = Normalizer::new(&parser, 1);
    let percent = format!("%{}3Cscript", "25".repeat(200));
    let once = normalizer.normalize(&percent);
    assert_eq!(once, "<script");
    assert_eq!(normalizer.normalize(&once), once);

    let entities = format!("&{}lt;script", "amp;".repeat(100));
    assert_eq!(normalizer.normalize(&entities), "<script");
}

#[test]
fn base64_data_uri_with_fragment() {
    let verdict = classify(r#"<a href="data:text/html;base64,PHNjcmlwdD4=#frag">x</a>"#);
    assert_eq!(verdict.reasons(), vec![ReasonCode::DangerousDataUriSurvived]);
}
