#![no_main]

use libfuzzer_sys::fuzz_target;
use lure_core::harness::test_one_input;
use lure_core::targets::ImageScanlinesHarness;

fuzz_target!(|data: &[u8]| {
    test_one_input(&ImageScanlinesHarness, data);
});
