//! Confidence tiers and the aggregate score.
//!
//! Confidence is a design-defined tier, not a probability. Every rule that
//! produces a value declares one of the tiers below.

/// Structural match: the response had exactly the expected shape.
pub const EXACT: f64 = 1.0;
/// Contextual or heuristic match.
pub const INFERRED: f64 = 0.7;
/// A structural match whose value failed its plausibility check.
pub const MALFORMED: f64 = 0.5;
/// Low-certainty guess, e.g. a value derived from a lookup table.
pub const GUESSED: f64 = 0.3;
/// Nothing extracted.
pub const NONE: f64 = 0.0;

/// Clamp into `[0.0, 1.0]`; NaN becomes 0.0.
pub fn clamp(confidence: f64) -> f64 {
    if confidence.is_nan() {
        NONE
    } else {
        confidence.clamp(NONE, EXACT)
    }
}

/// Mean of the strictly positive confidences, or exactly 0.0 when there are none.
pub fn aggregate<I>(confidences: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = confidences
        .into_iter()
        .filter(|c| *c > 0.0)
        .fold((0.0, 0u32), |(sum, n), c| (sum + c, n + 1));
    if count == 0 {
        NONE
    } else {
        clamp(sum / f64::from(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_ignores_zero() {
        assert_eq!(aggregate([1.0, 0.0, 0.5, 0.0]), 0.75);
        assert_eq!(aggregate([0.3]), 0.3);
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        assert_eq!(aggregate([]), 0.0);
        assert_eq!(aggregate([0.0, 0.0]), 0.0);
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp(2.0), 1.0);
        assert_eq!(clamp(-1.0), 0.0);
        assert_eq!(clamp(f64::NAN), 0.0);
        assert_eq!(clamp(INFERRED), 0.7);
    }
}
