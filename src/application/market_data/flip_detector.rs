use crate::domain::errors::FeatureError;

/// Cross-over event between two aligned series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flip {
    NoChange,
    Upward,
    Downward,
}

impl Flip {
    pub fn encode(self) -> f64 {
        match self {
            Flip::NoChange => 0.0,
            Flip::Upward => 1.0,
            Flip::Downward => -1.0,
        }
    }
}

/// Left-to-right scan remembering which side series A was last on.
///
/// Equal values (a zero difference) and NaN do not count as a side, so a
/// touch without a cross is not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlipDetector {
    last_was_above: Option<bool>,
}

impl FlipDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, a: f64, b: f64) -> Flip {
        let diff = a - b;
        let is_above = if diff > 0.0 {
            true
        } else if diff < 0.0 {
            false
        } else {
            return Flip::NoChange;
        };

        let flip = match self.last_was_above {
            Some(false) if is_above => Flip::Upward,
            Some(true) if !is_above => Flip::Downward,
            _ => Flip::NoChange,
        };
        self.last_was_above = Some(is_above);
        flip
    }
}

pub fn detect_flips(a: &[f64], b: &[f64]) -> Result<Vec<Flip>, FeatureError> {
    if a.len() != b.len() {
        return Err(FeatureError::MalformedSeries {
            reason: format!("flip inputs have lengths {} and {}", a.len(), b.len()),
        });
    }
    let mut detector = FlipDetector::new();
    Ok(a.iter().zip(b).map(|(x, y)| detector.next(*x, *y)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_output_is_no_change() {
        let flips = detect_flips(&[5.0], &[1.0]).unwrap();
        assert_eq!(flips, vec![Flip::NoChange]);
    }

    #[test]
    fn test_single_upward_cross() {
        let a = [1.0, 2.0, 3.0, 6.0, 7.0, 8.0];
        let b = [5.0, 5.0, 5.0, 5.0, 5.0, 5.0];
        let flips = detect_flips(&a, &b).unwrap();

        for (i, flip) in flips.iter().enumerate() {
            let expected = if i == 3 { Flip::Upward } else { Flip::NoChange };
            assert_eq!(*flip, expected, "index {}", i);
        }
    }

    #[test]
    fn test_downward_cross_and_encoding() {
        let flips = detect_flips(&[3.0, 1.0], &[2.0, 2.0]).unwrap();
        assert_eq!(flips, vec![Flip::NoChange, Flip::Downward]);
        assert_eq!(flips[1].encode(), -1.0);
        assert_eq!(Flip::Upward.encode(), 1.0);
    }

    #[test]
    fn test_touch_then_cross_counts_once() {
        // below, touch, above
        let flips = detect_flips(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]).unwrap();
        assert_eq!(flips, vec![Flip::NoChange, Flip::NoChange, Flip::Upward]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(detect_flips(&[1.0, 2.0], &[1.0]).is_err());
    }
}
