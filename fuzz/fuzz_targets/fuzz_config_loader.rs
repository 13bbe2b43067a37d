#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse or validation failures are fine, panics are not
    if let Ok(cfg) = toml::from_str::<jetgrid_config::Config>(data) {
        if cfg.validate().is_ok() {
            let _ = jetgrid_core::GeneratorCfg::try_from(&cfg);
        }
    }
});
