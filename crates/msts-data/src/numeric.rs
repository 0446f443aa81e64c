//! Numeric literals with an optional unit suffix (`10.5`, `10.5m`, `60mph`).

use msts_types::{Unit, UnitClass, UnitMismatch};
use winnow::Parser;
use winnow::ascii::float;
use winnow::token::rest;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NumericError {
    #[error("expected a number, got `{0}`")]
    NotANumber(String),
    #[error(transparent)]
    Unit(#[from] UnitMismatch),
}

fn number_and_suffix<'s>(input: &mut &'s str) -> winnow::Result<(f64, &'s str)> {
    (float, rest).parse_next(input)
}

/// Split `text` into its numeric value and the suffix directly after it.
/// Only finite values count as numbers; `nan` and `inf` do not.
pub fn split_suffix(text: &str) -> Option<(f64, &str)> {
    number_and_suffix
        .parse(text)
        .ok()
        .filter(|(value, _)| value.is_finite())
}

/// Value of `text` in the canonical unit of `class`.
///
/// Without a suffix `default_unit` applies; with neither, the number is
/// taken as already canonical.
pub fn to_canonical(
    text: &str,
    class: UnitClass,
    default_unit: Option<Unit>,
) -> Result<f64, NumericError> {
    let (value, suffix) =
        split_suffix(text).ok_or_else(|| NumericError::NotANumber(text.to_string()))?;
    let unit = if suffix.is_empty() {
        default_unit
    } else {
        Some(Unit::from_suffix(class, suffix)?)
    };
    Ok(unit.map_or(value, |u| u.convert(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_plain_and_suffixed() {
        assert_eq!(split_suffix("10.5"), Some((10.5, "")));
        assert_eq!(split_suffix("10.5m"), Some((10.5, "m")));
        assert_eq!(split_suffix("-3km/h"), Some((-3.0, "km/h")));
        assert_eq!(split_suffix("m"), None);
    }

    #[test]
    fn suffix_and_default_unit_agree() {
        let suffixed = to_canonical("10.5m", UnitClass::Distance, None).expect("10.5m");
        let defaulted =
            to_canonical("10.5", UnitClass::Distance, Some(Unit::Meters)).expect("10.5");
        assert_eq!(suffixed, defaulted);
    }

    #[test]
    fn default_unit_converts() {
        let v = to_canonical("2", UnitClass::Distance, Some(Unit::Kilometers)).expect("2");
        assert_eq!(v, 2000.0);
    }

    #[test]
    fn no_default_means_canonical() {
        assert_eq!(to_canonical("0.3", UnitClass::Speed, None), Ok(0.3));
    }

    #[test]
    fn cross_class_suffix_is_rejected() {
        let err = to_canonical("10.5mph", UnitClass::Distance, None).unwrap_err();
        assert_eq!(
            err,
            NumericError::Unit(UnitMismatch {
                suffix: "mph".into(),
                class: UnitClass::Distance,
            })
        );
    }

    #[test]
    fn feet_convert_to_meters() {
        let v = to_canonical("10ft", UnitClass::Distance, None).expect("10ft");
        assert!((v - 3.048).abs() < 1e-9);
    }

    #[test]
    fn non_finite_literals_are_not_numbers() {
        for text in ["nan", "inf", "-infinity", "NaN", "infm"] {
            assert_eq!(
                to_canonical(text, UnitClass::Distance, None),
                Err(NumericError::NotANumber(text.into())),
                "{text}"
            );
        }
    }

    #[test]
    fn garbage_is_not_a_number() {
        assert_eq!(
            to_canonical("abc", UnitClass::None, None),
            Err(NumericError::NotANumber("abc".into()))
        );
    }
}
