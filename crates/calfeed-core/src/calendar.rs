//! RFC 5545 calendar writer.
//!
//! Only the subset the feed needs: one `VCALENDAR` with fixed metadata and a
//! `VEVENT` per [`Event`]. Times are written in UTC (`...Z` form) so clients
//! never need a `VTIMEZONE` block. Lines end in CRLF and are folded at 75
//! octets without splitting UTF-8 sequences.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::domain::{Event, IdentitySeed};

pub const PRODID: &str = "-//US Combined Economic & Earnings Calendar//";
pub const CALENDAR_NAME: &str = "US Economic & Major Earnings Calendar";
pub const CALENDAR_TIMEZONE: &str = "America/New_York";
pub const UID_DOMAIN: &str = "us-financial-calendar";

/// Every event is rendered as a fixed-length block.
pub const EVENT_DURATION_MINUTES: i64 = 15;

const MAX_LINE_OCTETS: usize = 75;
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// `hex(sha256(seed))@us-financial-calendar`
pub fn uid_for(seed: &IdentitySeed) -> String {
    let digest = Sha256::digest(seed.as_str().as_bytes());
    format!("{}@{UID_DOMAIN}", hex::encode(digest))
}

/// Renders `events` in order, stamped with the current time.
pub fn render(events: &[Event]) -> String {
    render_at(events, Utc::now())
}

/// Same as [`render`] with a caller-supplied `DTSTAMP`.
pub fn render_at(events: &[Event], stamp: DateTime<Utc>) -> String {
    let mut doc = Document::default();
    doc.line("BEGIN", "VCALENDAR");
    doc.line("PRODID", PRODID);
    doc.line("VERSION", "2.0");
    doc.line("CALSCALE", "GREGORIAN");
    doc.line("METHOD", "PUBLISH");
    doc.text("X-WR-CALNAME", CALENDAR_NAME);
    doc.text("X-WR-TIMEZONE", CALENDAR_TIMEZONE);

    let dtstamp = stamp.format(UTC_FORMAT).to_string();
    for event in events {
        debug_assert!(!event.summary.trim().is_empty(), "event summary must not be empty");
        debug_assert!(!event.identity_seed.as_str().is_empty(), "event seed must not be empty");

        let start = event.utc();
        let end = start + Duration::minutes(EVENT_DURATION_MINUTES);

        doc.line("BEGIN", "VEVENT");
        doc.text("SUMMARY", &event.summary);
        doc.line("DTSTART", &start.format(UTC_FORMAT).to_string());
        doc.line("DTEND", &end.format(UTC_FORMAT).to_string());
        doc.line("UID", &uid_for(&event.identity_seed));
        doc.line("DTSTAMP", &dtstamp);
        if !event.description.is_empty() {
            doc.text("DESCRIPTION", &event.description);
        }
        doc.line("TRANSP", "OPAQUE");
        doc.line("END", "VEVENT");
    }

    doc.line("END", "VCALENDAR");
    doc.finish()
}

/// Smallest valid calendar, served when a rebuild fails.
pub fn empty_document() -> String {
    let mut doc = Document::default();
    doc.line("BEGIN", "VCALENDAR");
    doc.line("PRODID", PRODID);
    doc.line("VERSION", "2.0");
    doc.line("END", "VCALENDAR");
    doc.finish()
}

#[derive(Default)]
struct Document {
    out: String,
}

impl Document {
    /// Property whose value is already in wire form.
    fn line(&mut self, name: &str, value: &str) {
        let mut content = String::with_capacity(name.len() + value.len() + 1);
        content.push_str(name);
        content.push(':');
        content.push_str(value);
        self.push_folded(&content);
    }

    /// TEXT property; the value gets escaped.
    fn text(&mut self, name: &str, value: &str) {
        self.line(name, &escape_text(value));
    }

    fn push_folded(&mut self, content: &str) {
        let mut octets = 0;
        for ch in content.chars() {
            let width = ch.len_utf8();
            if octets + width > MAX_LINE_OCTETS {
                self.out.push_str("\r\n ");
                // the leading space counts toward the next line
                octets = 1;
            }
            self.out.push(ch);
            octets += width;
        }
        self.out.push_str("\r\n");
    }

    fn finish(self) -> String {
        self.out
    }
}

fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                escaped.push_str("\\n");
            }
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}
