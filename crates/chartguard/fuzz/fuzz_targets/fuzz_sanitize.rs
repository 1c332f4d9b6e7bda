//! Fuzz target for error-text sanitization.
//!
//! Checks that sanitized output never contains raw markup, whatever the
//! input.

#![no_main]

use chartguard::validation::sanitize::{sanitize_exception_text, sanitize_user_input};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    let user = sanitize_user_input(&text);
    assert!(!user.contains('<'));
    assert!(!user.to_lowercase().contains("javascript:"));

    let exception = sanitize_exception_text(&text);
    assert!(!exception.contains('<'));
});
