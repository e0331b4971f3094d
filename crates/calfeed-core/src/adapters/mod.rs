//! Financial Modeling Prep adapters.
//!
//! | Adapter | Endpoint | Chunked |
//! |---------|----------|---------|
//! | [`EconomicCalendarAdapter`] | `{stable}/economic-calendar?from&to` | yes |
//! | [`EarningsCalendarAdapter`] | `{stable}/earnings-calendar?from&to` | yes |
//! | [`ConstituentAdapter`] | `{v3}/sp500_constituent` | no |
//!
//! All three share one [`FmpClient`] for the API key, base URLs, timeout and
//! retry policy. Dated endpoints cap how far one call may reach, so windows
//! are split into sub-windows and fetched one after another.

mod calendars;
mod constituents;
mod fmp;

pub use calendars::{EarningsCalendarAdapter, EconomicCalendarAdapter};
pub use constituents::ConstituentAdapter;
pub use fmp::{FmpClient, DEFAULT_CHUNK_DAYS, DEFAULT_TIMEOUT_MS, LEGACY_BASE_URL, STABLE_BASE_URL};
