//! Value-space properties of the numeric, duration and temporal types

use std::cmp::Ordering;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use xmlschema_compiler::values::{Dec, Duration, Int, Temporal, TemporalKind};
use xmlschema_compiler::Error;

const BOUND: i64 = 1 << 62;

/// Lexical decimal for `n * 10^-scale`
fn render(n: i64, scale: u32) -> String {
    let mut digits = n.unsigned_abs().to_string();
    let scale = scale as usize;
    if scale > 0 {
        while digits.len() <= scale {
            digits.insert(0, '0');
        }
        digits.insert(digits.len() - scale, '.');
    }
    if n < 0 {
        digits.insert(0, '-');
    }
    digits
}

fn decimal() -> impl Strategy<Value = Dec> {
    (any::<i64>(), 0u32..12).prop_map(|(n, scale)| Dec::parse(&render(n, scale)).unwrap())
}

proptest! {
    #[test]
    fn integer_round_trip(n in -BOUND..=BOUND) {
        let parsed = Int::parse(&n.to_string()).unwrap();
        prop_assert_eq!(parsed.to_i64().unwrap(), n);
        prop_assert_eq!(Int::from_i64(n).to_canonical(), n.to_string());
    }

    #[test]
    fn scaled_integer_round_trip(d in decimal(), extra in 0u32..6) {
        let scale = d.scale() + extra;
        let int = d.to_scaled_int_exact(scale).unwrap();
        prop_assert_eq!(Dec::from_scaled_int(&int, scale).cmp(&d), Ordering::Equal);
    }

    #[test]
    fn decimal_compare_is_a_total_order(a in decimal(), b in decimal(), c in decimal()) {
        prop_assert_eq!(a.cmp(&a), Ordering::Equal);
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        if a <= b && b <= c {
            prop_assert!(a <= c);
        }
        if a.cmp(&b) == Ordering::Equal {
            prop_assert_eq!(a.to_canonical(), b.to_canonical());
        }
    }

    #[test]
    fn canonical_decimal_reparses(d in decimal()) {
        let again = Dec::parse(&d.to_canonical()).unwrap();
        prop_assert_eq!(again, d);
    }
}

#[test]
fn test_too_many_fraction_digits_is_not_exact() {
    let d = Dec::parse("1.25").unwrap();
    assert!(matches!(
        d.to_scaled_int_exact(1),
        Err(Error::IndeterminateConversion(_))
    ));
    assert_eq!(d.to_scaled_int_exact(3).unwrap().to_i64().unwrap(), 1250);
}

#[test]
fn test_duration_comparison() {
    let month = Duration::parse("P1M").unwrap();
    let days = Duration::parse("P30D").unwrap();
    assert!(matches!(
        month.compare(&days),
        Err(Error::IndeterminateComparison)
    ));

    let hours = Duration::parse("PT26H").unwrap();
    let mixed = Duration::parse("P1DT2H").unwrap();
    assert_eq!(hours.compare(&mixed).unwrap(), Ordering::Equal);
}

#[test]
fn test_leap_second() {
    let leap = Temporal::parse(TemporalKind::Time, "23:59:60").unwrap();
    let midnight = Temporal::parse(TemporalKind::Time, "00:00:00").unwrap();
    assert!(!leap.equal(&midnight));

    let zoned = Temporal::parse(TemporalKind::Time, "23:59:60Z").unwrap();
    assert_eq!(zoned.to_canonical(), "23:59:60Z");
}

#[test]
fn test_timezone_indeterminacy() {
    let zoned = Temporal::parse(TemporalKind::DateTime, "2024-03-01T12:00:00Z").unwrap();
    let local = Temporal::parse(TemporalKind::DateTime, "2024-03-01T20:00:00").unwrap();
    assert!(matches!(
        zoned.compare(&local),
        Err(Error::IndeterminateComparison)
    ));

    let far = Temporal::parse(TemporalKind::DateTime, "2024-03-03T12:00:00").unwrap();
    assert_eq!(zoned.compare(&far).unwrap(), Ordering::Less);
}
