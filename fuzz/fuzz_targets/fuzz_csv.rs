#![no_main]

use libfuzzer_sys::fuzz_target;
use positive_glm_analyzer::io::{read_permeability_from_bytes, read_trees_from_bytes};

fuzz_target!(|data: &[u8]| {
    let _ = read_trees_from_bytes(data, "fuzz");
    let _ = read_permeability_from_bytes(data, "fuzz");
});
