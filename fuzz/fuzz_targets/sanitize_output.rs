#![no_main]

use libfuzzer_sys::fuzz_target;
use omen_types::sanitize_output;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let out = sanitize_output(s);
        assert!(!out.contains('\r'));
        assert!(!out.contains('<'));
        assert!(!out.contains('>'));
    }
});
