use std::fmt::{Display, Formatter};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Inclusive calendar-date range sent to the providers as `from`/`to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Window from `today` through `today + days`.
    pub fn lookahead(today: NaiveDate, days: u32) -> Self {
        let end = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        Self { start: today, end }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Splits the window into consecutive inclusive spans of at most `chunk_days`.
    ///
    /// Spans never overlap and the last one is clipped to `end`.
    pub fn chunks(&self, chunk_days: u32) -> Result<Vec<DateWindow>, ValidationError> {
        if chunk_days == 0 {
            return Err(ValidationError::ZeroChunk);
        }

        let step = Days::new(u64::from(chunk_days - 1));
        let mut spans = Vec::new();
        let mut cursor = self.start;
        loop {
            let span_end = cursor
                .checked_add_days(step)
                .map_or(self.end, |candidate| candidate.min(self.end));
            spans.push(DateWindow {
                start: cursor,
                end: span_end,
            });

            match span_end.succ_opt() {
                Some(next) if span_end < self.end => cursor = next,
                _ => break,
            }
        }
        Ok(spans)
    }

    pub fn from_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn to_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl Display for DateWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn rejects_inverted_window() {
        let err = DateWindow::new(date(2024, 3, 2), date(2024, 3, 1)).expect_err("must fail");
        assert!(matches!(err, ValidationError::InvertedWindow { .. }));
    }

    #[test]
    fn lookahead_spans_inclusive_days() {
        let window = DateWindow::lookahead(date(2024, 1, 1), 365);
        assert_eq!(window.end, date(2024, 12, 31));
        assert_eq!(window.days(), 366);
    }

    #[test]
    fn chunks_cover_range_without_overlap() {
        let window = DateWindow::lookahead(date(2024, 1, 1), 365);
        let chunks = window.chunks(60).expect("valid chunk size");

        assert_eq!(chunks.len(), 7);
        assert_eq!(chunks[0], DateWindow::new(date(2024, 1, 1), date(2024, 2, 29)).expect("valid"));
        assert_eq!(chunks[1].start, date(2024, 3, 1));
        assert_eq!(chunks.last().map(|c| c.end), Some(window.end));

        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end.succ_opt(), Some(pair[1].start));
        }
        let covered: i64 = chunks.iter().map(DateWindow::days).sum();
        assert_eq!(covered, window.days());
    }

    #[test]
    fn single_day_window_yields_one_chunk() {
        let window = DateWindow::new(date(2024, 3, 12), date(2024, 3, 12)).expect("valid");
        assert_eq!(window.chunks(60).expect("valid"), vec![window]);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let window = DateWindow::lookahead(date(2024, 1, 1), 10);
        assert_eq!(window.chunks(0), Err(ValidationError::ZeroChunk));
    }

    #[test]
    fn formats_provider_params() {
        let window = DateWindow::new(date(2024, 3, 1), date(2024, 4, 30)).expect("valid");
        assert_eq!(window.from_param(), "2024-03-01");
        assert_eq!(window.to_param(), "2024-04-30");
    }
}
