#![no_main]
//! Builds an allow-list from fuzzer-chosen mutations of a preset and cleans
//! arbitrary markup with it. Whatever the policy, neither the sanitizer nor
//! the classifier may panic; findings are expected here and ignored.

use arbitrary::Arbitrary;
use citadel_parser::{AllowPolicy, AllowPreset, HtmlParser, Sanitizer};
use citadel_security::{Classifier, Policy};
use libfuzzer_sys::fuzz_target;

const COMMON_TAGS: &[&str] = &[
    "div", "span", "p", "a", "img", "table", "td", "blockquote", "q", "svg", "math", "form",
    "iframe", "object", "script", "style", "template", "noscript", "select", "textarea",
];

const COMMON_ATTRIBUTES: &[&str] = &[
    "class", "id", "title", "alt", "src", "href", "rel", "style", "srcset", "cite", "action",
    "formaction", "xlink:href", "onerror", "onload", "data-value",
];

const PROTOCOLS: &[&str] = &["http", "https", "ftp", "mailto", "tel", "data", "javascript", "file"];

#[derive(Arbitrary, Debug)]
enum Name {
    Known(u8),
    Free(String),
}

impl Name {
    fn resolve(&self, known: &[&str]) -> String {
        match self {
            Name::Known(index) => known[*index as usize % known.len()].to_string(),
            Name::Free(name) => name.clone(),
        }
    }
}

#[derive(Arbitrary, Debug)]
enum Mutation {
    AddTags(Vec<Name>),
    RemoveTags(Vec<Name>),
    AddAttributes(Name, Vec<Name>),
    RemoveAttributes(Name, Vec<Name>),
    AddProtocols(Vec<Name>),
    RemoveProtocols(Vec<Name>),
    PreserveRelativeLinks(bool),
}

#[derive(Arbitrary, Debug)]
struct Input {
    preset: u8,
    mutations: Vec<Mutation>,
    html: String,
}

fn names(list: &[Name], known: &[&str]) -> Vec<String> {
    list.iter().map(|name| name.resolve(known)).collect()
}

fn build_policy(input: &Input) -> AllowPolicy {
    let preset = AllowPreset::ALL[input.preset as usize % AllowPreset::ALL.len()];
    input
        .mutations
        .iter()
        .fold(AllowPolicy::from_preset(preset), |policy, mutation| match mutation {
            Mutation::AddTags(tags) => policy.add_tags(names(tags, COMMON_TAGS)),
            Mutation::RemoveTags(tags) => policy.remove_tags(names(tags, COMMON_TAGS)),
            Mutation::AddAttributes(tag, attributes) => policy
                .add_attributes(&tag.resolve(COMMON_TAGS), names(attributes, COMMON_ATTRIBUTES)),
            Mutation::RemoveAttributes(tag, attributes) => policy
                .remove_attributes(&tag.resolve(COMMON_TAGS), names(attributes, COMMON_ATTRIBUTES)),
            Mutation::AddProtocols(schemes) => policy.add_protocols(names(schemes, PROTOCOLS)),
            Mutation::RemoveProtocols(schemes) => policy.remove_protocols(names(schemes, PROTOCOLS)),
            Mutation::PreserveRelativeLinks(preserve) => policy.preserve_relative_links(*preserve),
        })
}

fuzz_target!(|input: Input| {
    if input.html.len() > 50_000 {
        return;
    }
    exercise(&input);
});

fn exercise(input: &Input) {
    // Invalid names are rejected up front rather than reaching ammonia.
    let Ok(sanitizer) = Sanitizer::new(build_policy(input)) else {
        return;
    };
    let cleaned = sanitizer.clean(&input.html);
    let _ = sanitizer.is_valid(&input.html);

    let parser = HtmlParser::default();
    if let Ok(root) = parser.parse_document(&cleaned) {
        let policy = Policy::strict();
        let _ = Classifier::new(&policy, &parser).classify_markup(&cleaned, &root);
    }
}
