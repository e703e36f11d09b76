#![no_main]
//! Cleans input with the relaxed allow-list and classifies the cleaned tree
//! with the strict policy. Any finding is a crash.
//!
//! Markup is cleaned as is; anything else is wrapped as `<img src="...">`.

use std::sync::OnceLock;

use citadel_harness::{Driver, HarnessConfig, HarnessError};
use citadel_parser::ParserError;
use libfuzzer_sys::fuzz_target;

fn driver() -> &'static Driver {
    static DRIVER: OnceLock<Driver> = OnceLock::new();
    DRIVER.get_or_init(|| {
        Driver::new(HarnessConfig::default()).unwrap_or_else(|e| panic!("bad config: {}", e))
    })
}

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    audit(&input);
});

fn audit(input: &str) {
    match driver().run(input) {
        Ok(outcome) => {
            if !outcome.is_safe() {
                panic!(
                    "Cleaner bypass: {}\nraw: {:?}\nclean: {:?}",
                    outcome.verdict.findings()[0],
                    outcome.raw,
                    outcome.cleaned
                );
            }
        }
        Err(HarnessError::Parser(ParserError::InputTooLarge { .. })) => {}
        Err(err) => panic!("Cleaning failed: {}", err),
    }
}
