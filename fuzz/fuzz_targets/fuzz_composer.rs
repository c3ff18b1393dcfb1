// Fuzz target composing arbitrary templates that reference each other through
// nested rule tokens; composition must always terminate.
#![no_main]

use gdm_protocol::catalog::ProductBuilder;
use gdm_rules::{Rule, RuleEngine, Slot, Variant};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // each line becomes the content of one reusable rule, ids starting at 1
    let rules: Vec<Rule> = text
        .lines()
        .take(16)
        .enumerate()
        .map(|(index, line)| {
            let mut rule = Rule::new(index as u64 + 1, "fuzz");
            rule.applies_to.insert(Slot::Reusable);
            rule.applies_to.insert(Slot::LongDescription);
            rule.content = line.to_string();
            rule.variants = vec![Variant::fallback(line.chars().rev().collect::<String>())];
            rule
        })
        .collect();

    let product = ProductBuilder::new(1, "[rule-1]").sku("[rule-2]").build();
    let engine = RuleEngine::new(rules);
    let (rendered, _) = engine.evaluate(&product);
    let _ = rendered.description.len();
});
