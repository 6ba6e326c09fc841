#![no_main]

use libfuzzer_sys::fuzz_target;
use omen_types::Mode;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mut store = omen_store::ExpectationStore::default();
        let _ = store.parse_str(s, Mode::Ci, "fuzz");
    }
});
