//! Notion ID normalization and preview-URL ID extraction.

use serde::Serialize;
use uuid::Uuid;

/// Dashless form of a Notion page/database ID.
///
/// Accepts dashed (`8-4-4-4-12`) and undashed UUIDs; anything else just has its dashes stripped.
pub fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match Uuid::try_parse(trimmed) {
        Ok(id) => id.simple().to_string(),
        Err(_) => trimmed.replace('-', ""),
    }
}

/// Strict variant of [`normalize_id`] for IDs that end up in a request path.
///
/// Only 32 hex digits or a dashed UUID are accepted; braces, `urn:` prefixes, slashes and
/// dot segments are all refused.
pub fn parse_notion_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !matches!(trimmed.len(), 32 | 36) {
        return None;
    }
    Uuid::try_parse(trimmed).ok().map(|id| id.simple().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewKind {
    Notion,
    GoogleDrive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewTarget {
    pub kind: PreviewKind,
    pub id: String,
}

/// Work out which embeddable resource a pasted URL or bare ID points at.
pub fn preview_target(input: &str) -> Option<PreviewTarget> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(id) = Uuid::try_parse(input) {
        return Some(PreviewTarget {
            kind: PreviewKind::Notion,
            id: id.simple().to_string(),
        });
    }

    let (without_fragment, _) = input.split_once('#').unwrap_or((input, ""));
    let (path_part, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));
    let after_scheme = path_part
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(path_part);
    let (host, path) = after_scheme.split_once('/').unwrap_or((after_scheme, ""));
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if on_domain(&host, "drive.google.com") || on_domain(&host, "docs.google.com") {
        let from_path = segments
            .iter()
            .position(|s| *s == "d")
            .and_then(|idx| segments.get(idx + 1))
            .map(|s| s.to_string());
        let id = from_path.or_else(|| query_param(query, "id"))?;
        if id.is_empty() {
            return None;
        }
        return Some(PreviewTarget {
            kind: PreviewKind::GoogleDrive,
            id,
        });
    }

    if on_domain(&host, "notion.so") || on_domain(&host, "notion.site") {
        let id = query_param(query, "p")
            .and_then(|p| trailing_notion_id(&p))
            .or_else(|| segments.last().and_then(|s| trailing_notion_id(s)))?;
        return Some(PreviewTarget {
            kind: PreviewKind::Notion,
            id,
        });
    }

    None
}

/// `host` is `domain` itself or one of its subdomains.
fn on_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
}

/// Notion slugs look like `Page-Title-<32 hex>`; a dashed UUID may also trail the slug.
fn trailing_notion_id(segment: &str) -> Option<String> {
    if let Ok(id) = Uuid::try_parse(segment) {
        return Some(id.simple().to_string());
    }
    for width in [36, 32] {
        let Some(start) = segment.len().checked_sub(width) else {
            continue;
        };
        let Some(tail) = segment.get(start..) else {
            continue;
        };
        if width == 32 && !tail.chars().all(|c| c.is_ascii_hexdigit()) {
            continue;
        }
        if let Ok(id) = Uuid::try_parse(tail) {
            return Some(id.simple().to_string());
        }
    }
    None
}
