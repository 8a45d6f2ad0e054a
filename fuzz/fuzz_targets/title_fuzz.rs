//! Fuzz title normalization and cache key encoding.
//!
//! Page names and locales arrive from request parameters, so any UTF-8 must
//! either be rejected or produce a title whose keys stay well-formed.
//!
//! Run with: cargo +nightly fuzz run title_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use sharedhelp_core::{CacheKey, Title};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (page, locale) = input.split_once('\n').unwrap_or((input, "en"));

    if let Some(title) = Title::parse(page) {
        assert!(!title.db_key().contains(' '));
        assert_eq!(title.other_page().other_page(), title);

        // Six components; escaping keeps stray colons out of the locale.
        let key = CacheKey::render(&title, locale, None).encode();
        assert_eq!(key.split(':').count(), 6, "malformed key {}", key);
    }

    if let Some(help) = Title::help(page) {
        assert!(help.prefixed_text().starts_with("Help:"));
    }
});
