// src/ingest/mod.rs
//! Row normalizer: turns provider records into warehouse rows.

pub mod providers;
pub mod types;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::{HeadlineRecord, ScoredHeadline, WarehouseRow};

/// Placeholder title the provider uses for articles pulled after publication.
pub const REMOVED_PLACEHOLDER: &str = "[Removed]";

const MAX_HEADLINE_CHARS: usize = 1024;

/// Normalize text: decode entities, collapse whitespace, cap length.
/// Titles are plain text, so `<` and `>` are content and stay untouched.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let out = html_escape::decode_html_entities(s);

    // 2) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    let mut out = re_ws.replace_all(&out, " ").trim().to_string();

    // 3) Length cap
    if out.chars().count() > MAX_HEADLINE_CHARS {
        out = out.chars().take(MAX_HEADLINE_CHARS).collect();
    }

    out
}

/// Drop check. Returns the cleaned headline, or `None` when the record must
/// never reach the warehouse (missing/blank title, removed-article placeholder).
pub fn prepare_headline(record: &HeadlineRecord) -> Option<String> {
    let title = normalize_text(record.title.as_deref()?);
    if title.is_empty() || title == REMOVED_PLACEHOLDER {
        return None;
    }
    Some(title)
}

/// Parse a provider timestamp. Anything but a valid RFC 3339 instant becomes `None`.
pub fn parse_published_at(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn clean_optional(v: Option<&str>) -> Option<String> {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build the persisted row. `ingested_at` is injected by the caller and shared
/// by every row of one batch.
pub fn build_row(scored: &ScoredHeadline, ingested_at: DateTime<Utc>) -> WarehouseRow {
    let rec = &scored.record;
    WarehouseRow {
        headline: scored.headline.clone(),
        source: clean_optional(rec.source.as_deref()),
        url: clean_optional(rec.url.as_deref()),
        published_at: parse_published_at(rec.published_at.as_deref()),
        sentiment_score: scored.sentiment_score,
        ingested_at,
    }
}
