#![no_main]
//! Basic allow-list with relative links preserved, payloads wrapped as
//! `<a href="...">x</a>`. Never crashes on a finding: findings, leads and
//! parser failures are written under `findings/` and `artifacts/` so a long
//! run keeps going. Paths can be changed through `CITADEL_AUDIT_CONFIG`.
//!
//! libfuzzer's panic hook aborts before unwinding, so the default hook is put
//! back on first use. Sanitizer panics then unwind into the driver and are
//! saved as parser failures. A panic anywhere else still aborts the run,
//! because libfuzzer-sys aborts on any panic that escapes the target.

use std::sync::OnceLock;

use citadel_harness::{DirectorySink, Driver, HarnessConfig, PayloadShape};
use citadel_parser::AllowPreset;
use libfuzzer_sys::fuzz_target;

struct Harness {
    driver: Driver,
    sink: DirectorySink,
}

fn harness() -> &'static Harness {
    static HARNESS: OnceLock<Harness> = OnceLock::new();
    HARNESS.get_or_init(|| {
        restore_default_panic_hook();
        let base = HarnessConfig::from_env().unwrap_or_default();
        let config = HarnessConfig {
            allow_preset: AllowPreset::Basic,
            preserve_relative_links: true,
            payload_shape: PayloadShape::AnchorHref,
            ..base
        };
        Harness {
            sink: DirectorySink::from_config(&config),
            driver: Driver::new(config).unwrap_or_else(|e| panic!("bad config: {}", e)),
        }
    })
}

fn restore_default_panic_hook() {
    drop(std::panic::take_hook());
}

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let harness = harness();
    harness.driver.run_and_record(&input, &harness.sink);
});
