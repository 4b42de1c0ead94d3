//! REPORT request bodies.

use std::fmt::Write;

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="utf-8" ?>"#;

/// calendar-query REPORT listing the ETag of every object in the collection.
pub fn calendar_query_etags() -> String {
    format!(
        r#"{XML_HEADER}
<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
    <D:prop>
        <D:getetag/>
    </D:prop>
    <C:filter>
        <C:comp-filter name="VCALENDAR"/>
    </C:filter>
</C:calendar-query>"#
    )
}

/// calendar-multiget REPORT for the given hrefs, optionally including the
/// calendar data itself.
pub fn calendar_multiget<'a>(
    hrefs: impl IntoIterator<Item = &'a str>,
    with_data: bool,
) -> String {
    let mut body = format!(
        r#"{XML_HEADER}
<C:calendar-multiget xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
    <D:prop>
        <D:getetag/>"#
    );

    if with_data {
        body.push_str("\n        <C:calendar-data/>");
    }
    body.push_str("\n    </D:prop>");

    for href in hrefs {
        // Writing to a String cannot fail
        let _ = write!(body, "\n    <D:href>{}</D:href>", escape_xml(href));
    }

    body.push_str("\n</C:calendar-multiget>");
    body
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
