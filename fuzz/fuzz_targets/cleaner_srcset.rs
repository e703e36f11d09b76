#![no_main]
//! Payloads placed in `<img srcset>` on a relaxed allow-list that permits
//! srcset. Every candidate URL must come out harmless.

use std::sync::OnceLock;

use citadel_harness::{Driver, HarnessConfig, HarnessError, PayloadShape};
use citadel_parser::{AllowPolicy, ParserError};
use libfuzzer_sys::fuzz_target;

fn driver() -> &'static Driver {
    static DRIVER: OnceLock<Driver> = OnceLock::new();
    DRIVER.get_or_init(|| {
        let config = HarnessConfig {
            payload_shape: PayloadShape::ImgSrcset,
            ..Default::default()
        };
        Driver::new(config)
            .and_then(|driver| {
                driver.with_allow_policy(AllowPolicy::relaxed().add_attributes("img", ["srcset"]))
            })
            .unwrap_or_else(|e| panic!("bad config: {}", e))
    })
}

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    audit(&input);
});

fn audit(input: &str) {
    match driver().run(input) {
        Ok(outcome) if !outcome.is_safe() => panic!(
            "Cleaner bypass (srcset): {}\nclean: {:?}",
            outcome.verdict.findings()[0],
            outcome.cleaned
        ),
        Ok(_) => {}
        Err(HarnessError::Parser(ParserError::InputTooLarge { .. })) => {}
        Err(err) => panic!("Cleaning failed: {}", err),
    }
}
