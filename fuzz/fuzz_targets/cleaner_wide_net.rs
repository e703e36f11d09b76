#![no_main]
//! Relaxed allow-list against the wide-net policy: svg, math and link count
//! as dangerous, and empty event handlers are findings. Findings crash;
//! leads from the text scan do not.

use std::sync::OnceLock;

use citadel_harness::{Driver, HarnessConfig, HarnessError};
use citadel_parser::ParserError;
use citadel_security::PolicyPreset;
use libfuzzer_sys::fuzz_target;

fn driver() -> &'static Driver {
    static DRIVER: OnceLock<Driver> = OnceLock::new();
    DRIVER.get_or_init(|| {
        let config = HarnessConfig {
            classifier_preset: PolicyPreset::WideNet,
            ..Default::default()
        };
        Driver::new(config).unwrap_or_else(|e| panic!("bad config: {}", e))
    })
}

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    audit(&input);
});

fn audit(input: &str) {
    match driver().run(input) {
        Ok(outcome) if !outcome.is_safe() => {
            let reasons: Vec<String> = outcome
                .verdict
                .findings()
                .iter()
                .map(ToString::to_string)
                .collect();
            panic!(
                "Cleaner bypass (wide net):\n{}\nclean: {:?}",
                reasons.join("\n"),
                outcome.cleaned
            );
        }
        Ok(_) => {}
        Err(HarnessError::Parser(ParserError::InputTooLarge { .. })) => {}
        Err(err) => panic!("Cleaning failed: {}", err),
    }
}
