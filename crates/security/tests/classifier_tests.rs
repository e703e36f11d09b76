use citadel_security::{
    classify, Classifier, EntityDecoder, LeadKind, Policy, PolicyBuilder, PolicyPreset,
    ReasonCode, SanitizedNode,
};
use pretty_assertions::assert_eq;

/// Leaves character references alone.
struct NoEntities;

impl EntityDecoder for NoEntities {
    fn unescape_entities(&self, input: &str, _strict: bool) -> String {
        input.to_string()
    }
}

fn document(children: Vec<SanitizedNode>) -> SanitizedNode {
    children
        .into_iter()
        .fold(SanitizedNode::document(), |root, child| root.with_child(child))
}

#[test]
fn test_presets_disagree_on_svg() {
    let root = document(vec![SanitizedNode::new("svg")
        .with_child(SanitizedNode::new("circle").with_attribute("r", "4"))]);

    assert!(classify(&root, &Policy::strict(), &NoEntities).is_safe());

    let wide = classify(&root, &Policy::wide_net(), &NoEntities);
    assert_eq!(wide.reasons(), vec![ReasonCode::DisallowedTagSurvived]);
}

#[test]
fn test_custom_policy_scheme() {
    let policy = PolicyBuilder::from_preset(PolicyPreset::Strict)
        .dangerous_schemes(["livescript"])
        .build()
        .unwrap();
    let root = document(vec![SanitizedNode::new("a").with_attribute("href", "LiveScript:go()")]);

    assert!(classify(&root, &Policy::strict(), &NoEntities).is_safe());
    assert!(classify(&root, &policy, &NoEntities).has_reason(ReasonCode::DangerousSchemeSurvived));
}

#[test]
fn test_custom_url_attribute() {
    let policy = PolicyBuilder::from_preset(PolicyPreset::Strict)
        .url_attributes(["ping"])
        .build()
        .unwrap();
    assert!(policy.is_url_bearing("ping"));

    let root = document(vec![SanitizedNode::new("a").with_attribute("ping", "/track#javascript:x")]);
    let verdict = classify(&root, &policy, &NoEntities);
    assert!(verdict.is_safe());
    assert_eq!(verdict.leads()[0].kind, LeadKind::FragmentScheme);
}

#[test]
fn test_percent_encoded_data_uri_in_srcset() {
    let root = document(vec![SanitizedNode::new("img").with_attribute(
        "srcset",
        "data:image/svg+xml,%3Csvg%20onload%3Dalert(1)%3E 1x",
    )]);
    let verdict = classify(&root, &Policy::strict(), &NoEntities);
    assert_eq!(verdict.reasons(), vec![ReasonCode::DangerousDataUriSurvived]);
}

#[test]
fn test_findings_follow_preorder() {
    let root = document(vec![
        SanitizedNode::new("div")
            .with_child(SanitizedNode::new("a").with_attribute("href", "javascript:1"))
            .with_attribute("onclick", "x"),
        SanitizedNode::new("iframe"),
    ]);
    let verdict = classify(&root, &Policy::strict(), &NoEntities);
    let locations: Vec<String> = verdict.findings().iter().map(|f| f.location.to_string()).collect();
    assert_eq!(locations, vec!["div.onclick", "a.href", "iframe"]);
}

#[test]
fn test_shared_policy_across_threads() {
    let policy = Policy::wide_net();
    let classifier = Classifier::new(&policy, &NoEntities);
    let trees: Vec<SanitizedNode> = (0..8)
        .map(|i| {
            let href = if i % 2 == 0 { "javascript:alert(1)" } else { "https://example.com" };
            document(vec![SanitizedNode::new("a").with_attribute("href", href)])
        })
        .collect();

    let results: Vec<bool> = std::thread::scope(|scope| {
        let handles: Vec<_> = trees
            .iter()
            .map(|tree| {
                let classifier = &classifier;
                scope.spawn(move || classifier.classify(tree).is_safe())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results, vec![false, true, false, true, false, true, false, true]);
}

#[test]
fn test_tree_is_untouched() {
    let root = document(vec![SanitizedNode::new("img").with_attribute("onerror", "alert(1)")]);
    let before = root.clone();
    let _ = classify(&root, &Policy::strict(), &NoEntities);
    assert_eq!(root, before);
}
