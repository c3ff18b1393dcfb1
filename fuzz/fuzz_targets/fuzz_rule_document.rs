// Fuzz target feeding arbitrary bytes to the rule document parser.
#![no_main]

use std::path::Path;

use gdm_rules::parse_rules;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(rules) = parse_rules(text, Path::new("fuzz.yaml")) {
            for rule in &rules {
                let _ = rule.validate();
            }
        }
    }
});
