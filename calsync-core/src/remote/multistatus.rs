//! Typed decoding of WebDAV multistatus responses.
//!
//! All namespace handling lives here: the rest of the crate only sees
//! [`MultistatusEntry`] values.

use std::ops::Range;

use roxmltree::Node;

use super::RemoteSnapshot;
use crate::error::{CalSyncError, CalSyncResult};

const DAV_NS: &str = "DAV:";
const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

/// Maximum number of bytes of an unparsable body echoed in errors.
const BODY_EXCERPT_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultistatusEntry {
    Found {
        href: String,
        etag: String,
        data: Option<String>,
    },
    NotFound {
        href: String,
    },
}

/// Decode a multistatus body.
///
/// Every `response` must carry an href and, unless the server reported it
/// as not found, an ETag. With `require_data` each found entry must also
/// carry calendar data. Any missing node is fatal and the error includes
/// the offending XML fragment.
pub fn parse_multistatus(body: &str, require_data: bool) -> CalSyncResult<Vec<MultistatusEntry>> {
    let entries = decode(body, require_data, true)?;
    Ok(entries.into_iter().map(|(entry, _)| entry).collect())
}

/// Decode the answer to an ETag listing into a snapshot.
///
/// A listing names only existing objects, so a response without an ETag,
/// including one with a not-found status, is fatal. So is an href listed
/// twice.
pub fn parse_etag_listing(body: &str) -> CalSyncResult<RemoteSnapshot> {
    let mut snapshot = RemoteSnapshot::new();

    for (entry, range) in decode(body, false, false)? {
        let MultistatusEntry::Found { href, etag, .. } = entry else {
            continue;
        };
        if snapshot.contains_key(&href) {
            return Err(CalSyncError::malformed(
                format!("Duplicate href {}.", href),
                body[range].to_string(),
            ));
        }
        snapshot.insert(href, etag);
    }

    Ok(snapshot)
}

/// Every `response` element as an entry, with its byte range in `body`.
fn decode(
    body: &str,
    require_data: bool,
    allow_not_found: bool,
) -> CalSyncResult<Vec<(MultistatusEntry, Range<usize>)>> {
    let doc = roxmltree::Document::parse(body).map_err(|e| {
        let excerpt: String = body.chars().take(BODY_EXCERPT_LEN).collect();
        CalSyncError::malformed(format!("Invalid XML: {}", e), excerpt)
    })?;

    let mut entries = Vec::new();

    for response in doc
        .descendants()
        .filter(|n| n.has_tag_name((DAV_NS, "response")))
    {
        let range = response.range();
        let fragment = || body[range.clone()].to_string();

        let href = child(response, DAV_NS, "href")
            .map(text_of)
            .map(|h| normalize_href(&h))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CalSyncError::malformed("Missing href.", fragment()))?;

        if let Some(status) = child(response, DAV_NS, "status").and_then(parse_status) {
            if !allow_not_found && !(200..300).contains(&status) {
                return Err(CalSyncError::malformed("Missing ETag.", fragment()));
            }
            if status == 404 {
                entries.push((MultistatusEntry::NotFound { href }, range));
                continue;
            }
            if !(200..300).contains(&status) {
                return Err(CalSyncError::malformed(
                    format!("Unexpected status {} for {}.", status, href),
                    fragment(),
                ));
            }
        }

        let etag = find_prop(response, DAV_NS, "getetag")
            .map(text_of)
            .map(|e| strip_etag(&e))
            .filter(|e| !e.is_empty())
            .ok_or_else(|| CalSyncError::malformed("Missing ETag.", fragment()))?;

        let data = find_prop(response, CALDAV_NS, "calendar-data").map(text_of);
        if require_data && data.is_none() {
            return Err(CalSyncError::malformed("Missing calendar data.", fragment()));
        }

        entries.push((MultistatusEntry::Found { href, etag, data }, range));
    }

    Ok(entries)
}

/// Remove the quotes around a strong ETag. Weak tags (`W/"..."`) keep
/// their prefix and quotes, since the prefix is part of the value.
pub fn strip_etag(etag: &str) -> String {
    let etag = etag.trim();
    if etag.starts_with("W/") {
        return etag.to_string();
    }
    etag.trim_matches('"').to_string()
}

/// The `If-Match` form of a stored ETag: strong tags are quoted again,
/// weak tags are sent as stored.
pub fn if_match_value(etag: &str) -> String {
    if etag.starts_with("W/") {
        etag.to_string()
    } else {
        format!("\"{}\"", etag)
    }
}

/// Servers may answer with absolute URLs; keep only the path.
fn normalize_href(href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        if let Ok(url) = url::Url::parse(href) {
            return url.path().to_string();
        }
    }
    href.to_string()
}

fn child<'a, 'input>(node: Node<'a, 'input>, ns: &str, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name((ns, name)))
}

/// Find a property inside a successful `propstat` of `response`.
fn find_prop<'a, 'input>(
    response: Node<'a, 'input>,
    ns: &str,
    name: &str,
) -> Option<Node<'a, 'input>> {
    response
        .children()
        .filter(|n| n.has_tag_name((DAV_NS, "propstat")))
        .filter(|propstat| {
            child(*propstat, DAV_NS, "status")
                .and_then(parse_status)
                .is_none_or(|s| (200..300).contains(&s))
        })
        .filter_map(|propstat| child(propstat, DAV_NS, "prop"))
        .find_map(|prop| child(prop, ns, name))
}

/// `HTTP/1.1 404 Not Found` -> 404
fn parse_status(node: Node) -> Option<u16> {
    text_of(node).split_whitespace().nth(1)?.parse().ok()
}

/// Concatenated text content, CDATA included.
fn text_of(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
