//! DogStatsD datagram encoding.
//!
//! ```text
//! gauge          name:value|g|#tags
//! timing         name:ms|ms|#tags
//! event          _e{title_len,text_len}:title|text|d:ts|k:key|t:alert|#tags
//! service check  _sc|name|status|d:ts|#tags|m:message
//! ```
//!
//! Event tags come first, global tags are appended. Characters that would
//! break the framing (`|`, `,`, `#`, newlines) are replaced by `_` in tags.

use std::fmt::Write as _;
use std::time::Duration;

use super::{CheckOptions, CheckStatus, EventOptions};
use crate::tags::TagSet;

fn sanitize_tag(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '|' | ',' | '#' | '\n' | '\r' => '_',
            c => c,
        })
        .collect()
}

fn escape_text(raw: &str) -> String {
    raw.replace("\r\n", "\\n").replace('\n', "\\n")
}

fn push_tags(out: &mut String, tags: &TagSet, global: &[String]) {
    let rendered = tags
        .iter()
        .map(|t| sanitize_tag(&t.to_string()))
        .chain(global.iter().map(|g| sanitize_tag(g)));

    let mut first = true;
    for tag in rendered {
        out.push_str(if first { "|#" } else { "," });
        out.push_str(&tag);
        first = false;
    }
}

pub(crate) fn gauge(name: &str, value: f64, tags: &TagSet, global: &[String]) -> String {
    let mut out = format!("{name}:{value}|g");
    push_tags(&mut out, tags, global);
    out
}

pub(crate) fn timing(name: &str, duration: Duration, tags: &TagSet, global: &[String]) -> String {
    let mut out = format!("{name}:{}|ms", duration.as_millis());
    push_tags(&mut out, tags, global);
    out
}

pub(crate) fn event(
    title: &str,
    text: Option<&str>,
    opts: &EventOptions,
    tags: &TagSet,
    global: &[String],
) -> String {
    let title = escape_text(title);
    let text = escape_text(text.unwrap_or(&title));

    let mut out = format!("_e{{{},{}}}:{title}|{text}", title.len(), text.len());
    if let Some(ts) = opts.date_happened {
        let _ = write!(out, "|d:{ts}");
    }
    if let Some(key) = &opts.aggregation_key {
        let _ = write!(out, "|k:{}", sanitize_tag(key));
    }
    if let Some(alert) = opts.alert_type {
        let _ = write!(out, "|t:{}", alert.as_str());
    }
    push_tags(&mut out, tags, global);
    out
}

pub(crate) fn check(
    name: &str,
    status: CheckStatus,
    opts: &CheckOptions,
    tags: &TagSet,
    global: &[String],
) -> String {
    let mut out = format!("_sc|{name}|{}", status.code());
    if let Some(ts) = opts.date_happened {
        let _ = write!(out, "|d:{ts}");
    }
    push_tags(&mut out, tags, global);
    if let Some(message) = &opts.message {
        let _ = write!(out, "|m:{}", escape_text(message).replace("m:", "m\\:"));
    }
    out
}
