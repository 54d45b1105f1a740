//! # Invoice Number Generation
//!
//! Pure string math for human-facing invoice numbers. The storage
//! backends own *when* a number is minted; this module owns *what* the
//! number looks like.
//!
//! ## Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Invoice Number Layout                                │
//! │                                                                         │
//! │      INV - 260807 - 0001                                               │
//! │      ───   ──────   ────                                               │
//! │       │       │       │                                                 │
//! │       │       │       └── 4-digit suffix                               │
//! │       │       │           • embedded backend: daily sequence (0001..) │
//! │       │       │           • hosted backend: millisecond clock digits  │
//! │       │       └────────── day stamp (YYMMDD)                           │
//! │       └────────────────── fixed prefix, configurable per engine        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Variants
//! - [`next_sequential`]: parses the most recent same-day number and
//!   increments it. Race-free only when executed inside the embedded
//!   backend's single-writer transaction.
//! - [`time_suffixed`]: appends the last 4 digits of the millisecond
//!   wall clock. Used by the hosted backend, which cannot cheaply hold
//!   an exclusive lock across a network round trip. Non-sequential and
//!   theoretically collidable under very high-frequency concurrent
//!   writes; a collision surfaces as a unique-constraint failure.
//!
//! Downstream code treats invoice numbers as opaque strings.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{CoreError, CoreResult};

/// Default fixed prefix for invoice numbers.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Width of the zero-padded suffix.
///
/// Ordering within a day relies on zero padding, so the lexicographic
/// maximum is the numeric maximum. Past 9999 sales in one day the
/// suffix widens and ordering degrades; no shop this engine targets
/// gets near that volume.
pub const SEQUENCE_WIDTH: usize = 4;

/// Composes the shared day prefix, e.g. `INV-260807-`.
///
/// Used both to build new numbers and as the pattern for the
/// "latest invoice today" lookup (`LIKE 'INV-260807-%'`).
pub fn day_prefix(prefix: &str, day: NaiveDate) -> String {
    format!("{}-{}-", prefix, day.format("%y%m%d"))
}

/// Parses the trailing sequence digits of an invoice number.
///
/// Returns `None` when the suffix is missing or non-numeric.
pub fn parse_sequence(invoice_no: &str) -> Option<u32> {
    invoice_no
        .rsplit('-')
        .next()
        .and_then(|suffix| suffix.parse::<u32>().ok())
}

/// Produces the next sequential invoice number for `day`.
///
/// `last` is the most recent invoice number already persisted with the
/// same day prefix, if any. Absent a predecessor the sequence starts
/// at 1.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use vend_core::invoice;
///
/// let day = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
/// let first = invoice::next_sequential("INV", day, None).unwrap();
/// assert_eq!(first, "INV-260807-0001");
///
/// let second = invoice::next_sequential("INV", day, Some(first.as_str())).unwrap();
/// assert_eq!(second, "INV-260807-0002");
/// ```
pub fn next_sequential(prefix: &str, day: NaiveDate, last: Option<&str>) -> CoreResult<String> {
    let seq = match last {
        None => 1,
        Some(last) => {
            let parsed = parse_sequence(last)
                .ok_or_else(|| CoreError::MalformedInvoiceNumber(last.to_string()))?;
            parsed + 1
        }
    };

    Ok(format!(
        "{}{:0width$}",
        day_prefix(prefix, day),
        seq,
        width = SEQUENCE_WIDTH
    ))
}

/// Produces a time-suffixed invoice number for the hosted backend.
///
/// The suffix is the last 4 digits of the millisecond timestamp,
/// trading strict sequentiality for practical uniqueness without a
/// cross-network lock.
pub fn time_suffixed(prefix: &str, now: DateTime<Utc>) -> String {
    let fragment = (now.timestamp_millis() % 10_000) as u32;
    format!(
        "{}{:0width$}",
        day_prefix(prefix, now.date_naive()),
        fragment,
        width = SEQUENCE_WIDTH
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
    }

    #[test]
    fn test_day_prefix_layout() {
        assert_eq!(day_prefix("INV", day()), "INV-260807-");
        assert_eq!(day_prefix("POS", day()), "POS-260807-");
    }

    #[test]
    fn test_first_invoice_of_the_day() {
        let first = next_sequential("INV", day(), None).unwrap();
        assert_eq!(first, "INV-260807-0001");
    }

    #[test]
    fn test_sequence_increments_by_one() {
        let next = next_sequential("INV", day(), Some("INV-260807-0041")).unwrap();
        assert_eq!(next, "INV-260807-0042");
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("INV-260807-0007"), Some(7));
        assert_eq!(parse_sequence("INV-260807-9999"), Some(9999));
        assert_eq!(parse_sequence("INV-260807-"), None);
        assert_eq!(parse_sequence("garbage"), None);
    }

    #[test]
    fn test_malformed_predecessor_is_an_error() {
        let err = next_sequential("INV", day(), Some("INV-260807-XYZ")).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInvoiceNumber(_)));
    }

    #[test]
    fn test_time_suffixed_layout() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 13, 45, 12).unwrap();
        let invoice = time_suffixed("INV", now);
        assert!(invoice.starts_with("INV-260807-"));
        assert_eq!(invoice.len(), "INV-260807-0000".len());
        assert!(parse_sequence(&invoice).is_some());
    }

    #[test]
    fn test_sequence_width_is_zero_padded() {
        let n = next_sequential("INV", day(), Some("INV-260807-0009")).unwrap();
        assert_eq!(n, "INV-260807-0010");
    }
}
