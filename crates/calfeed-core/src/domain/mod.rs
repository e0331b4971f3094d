//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Event`] | Canonical scheduled event (economic release, earnings, placeholder) |
//! | [`IdentitySeed`] | Raw-field key that the calendar UID is hashed from |
//! | [`RawRecord`] | Provider row, economic or earnings, with tolerant field decoding |
//! | [`Symbol`] | Validated equity ticker |
//! | [`DateWindow`] | Inclusive date range with provider-sized chunking |
//!
//! Constructors enforce the invariants the calendar serializer relies on: an
//! [`Event`] always has a non-empty summary and seed.

mod event;
mod record;
mod symbol;
mod window;

pub use event::{Event, EventKind, IdentitySeed};
pub use record::{EarningsRecord, EconomicRecord, RawRecord};
pub use symbol::{Symbol, DOW_30};
pub use window::DateWindow;
