#![no_main]

use libfuzzer_sys::fuzz_target;
use lure_core::harness::test_one_input;
use lure_core::targets::ChemIdentifierHarness;

fuzz_target!(|data: &[u8]| {
    test_one_input(&ChemIdentifierHarness, data);
});
