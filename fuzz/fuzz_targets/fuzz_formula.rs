#![no_main]

use libfuzzer_sys::fuzz_target;
use positive_glm_analyzer::glm::Formula;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(formula) = Formula::parse(text) {
            // Display output must parse back to the same formula
            let again = Formula::parse(&formula.to_string()).expect("display should re-parse");
            assert_eq!(formula, again);
        }
    }
});
