//! Fuzz decoding of authority parse responses and the link rewrites applied
//! to the rendered HTML.
//!
//! Run with: cargo +nightly fuzz run render_response_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use sharedhelp_core::NamespaceTranslationPair;
use sharedhelp_remote::{parse_render_response, rewrite_article_links, rewrite_namespaces};

fuzz_target!(|data: &[u8]| {
    let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Malformed bodies must come back as errors, never panics.
    let Ok(render) = parse_render_response(&body, "Help:Editing") else {
        return;
    };

    let remote = NamespaceTranslationPair::new("ShoutWiki", "ShoutWiki talk");
    let local = NamespaceTranslationPair::new("Project", "Project talk");
    let html = rewrite_namespaces(&render.html, &remote, &local);
    let html = rewrite_article_links(&html, "/wiki/");
    assert!(!html.contains("ShoutWiki:"));
});
