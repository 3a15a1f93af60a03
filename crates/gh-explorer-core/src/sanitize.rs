//! Markup sanitization for fetched file content
//!
//! File bodies come from arbitrary repositories and may be rendered by the
//! host. Executable markup is removed before the content is cached: script
//! and style blocks, embedding elements, inline event handlers and
//! `javascript:` URLs. Everything else, including generic-looking text such
//! as `Vec<String>`, passes through untouched.

use gh_explorer_client::{ContentEntry, ContentType, RepoContent};
use regex::Regex;
use std::sync::LazyLock;

static BLOCK_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|iframe|object)\b[^>]*>.*?</(script|style|iframe|object)\s*>")
        .expect("valid regex")
});

static DANGEROUS_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(script|style|iframe|object|embed|link|meta|base)\b[^>]*>")
        .expect("valid regex")
});

static OPENING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z][^<>]*>").expect("valid regex"));

static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
});

static SCRIPT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(href|src|action)\s*=\s*(?:"\s*javascript:[^"]*"|'\s*javascript:[^']*'|javascript:[^\s>]*)"#)
        .expect("valid regex")
});

/// Strip executable markup from `input`
///
/// Passes repeat until nothing changes, so fragments left around a removed
/// tag cannot join into a new one. Every change shortens the text.
pub fn sanitize_markup(input: &str) -> String {
    let mut current = sanitize_pass(input);
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn sanitize_pass(input: &str) -> String {
    let without_blocks = BLOCK_ELEMENTS.replace_all(input, "");
    let without_tags = DANGEROUS_TAGS.replace_all(&without_blocks, "");
    OPENING_TAG
        .replace_all(&without_tags, |caps: &regex::Captures<'_>| {
            let tag = EVENT_HANDLER.replace_all(&caps[0], "");
            SCRIPT_URL.replace_all(&tag, "${1}=\"\"").into_owned()
        })
        .into_owned()
}

fn sanitize_entry(mut entry: ContentEntry) -> ContentEntry {
    if entry.kind == ContentType::File {
        entry.content = entry.content.map(|body| sanitize_markup(&body));
    }
    entry
}

/// Sanitize every file body carried by `content`
pub fn sanitize_content(content: RepoContent) -> RepoContent {
    match content {
        RepoContent::Entry(entry) => RepoContent::Entry(sanitize_entry(entry)),
        RepoContent::Listing(entries) => {
            RepoContent::Listing(entries.into_iter().map(sanitize_entry).collect())
        }
    }
}
