#![no_main]
//! Places each payload in href, src, form action, SVG xlink:href and srcset,
//! and cleans every candidate with relative links both preserved and
//! resolved against `https://example.com/`.

use std::sync::OnceLock;

use citadel_harness::{Driver, HarnessConfig, HarnessError};
use citadel_parser::{AllowPreset, ParserError};
use libfuzzer_sys::fuzz_target;

fn driver() -> &'static Driver {
    static DRIVER: OnceLock<Driver> = OnceLock::new();
    DRIVER.get_or_init(|| {
        let config = HarnessConfig {
            allow_preset: AllowPreset::Basic,
            base_url: Some("https://example.com/".to_string()),
            ..Default::default()
        };
        Driver::new(config).unwrap_or_else(|e| panic!("bad config: {}", e))
    })
}

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    audit(&input);
});

fn audit(payload: &str) {
    let outcomes = match driver().run_candidates(payload) {
        Ok(outcomes) => outcomes,
        Err(HarnessError::Parser(ParserError::InputTooLarge { .. })) => return,
        Err(err) => panic!("Cleaning failed: {}", err),
    };
    for outcome in outcomes {
        if let Some(finding) = outcome.verdict.findings().first() {
            panic!(
                "Cleaner bypass: {}\ndocument: {:?}\nclean: {:?}",
                finding, outcome.document, outcome.cleaned
            );
        }
    }
}

#[cfg(test)]
mod fuzz_test_cases {
    use super::*;

    #[test]
    fn test_candidate_vectors() {
        let cases = [
            "javascript:alert(1)",
            "JaVaScRiPt:alert(1)",
            "&#106;avascript:alert(1)",
            "java\tscript:alert(1)",
            "/javascript:alert(1)",
            "//javascript:alert(1)",
            "x\" onmouseover=\"alert(1)",
            "https://example.com/?next=javascript:alert(1)",
        ];
        for case in cases {
            audit(case);
        }
    }
}
