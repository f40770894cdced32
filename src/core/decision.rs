use crate::core::geo::distance_km;
use crate::domain::model::{ChangeDecision, Coordinate};

pub const DEFAULT_CHANGE_THRESHOLD_KM: f64 = 100.0;

/// Classifies a newly resolved coordinate against the stored one.
///
/// A distance equal to the threshold is still `Unchanged`.
pub fn decide(new: Coordinate, current: Option<Coordinate>, threshold_km: f64) -> ChangeDecision {
    let Some(current) = current else {
        return ChangeDecision::FirstTimeSetup;
    };

    let distance = distance_km(new, current);
    if distance > threshold_km {
        ChangeDecision::Changed(distance)
    } else {
        ChangeDecision::Unchanged(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATLANTA: Coordinate = Coordinate::new(33.7490, -84.3880);
    const NEW_YORK: Coordinate = Coordinate::new(40.7128, -74.0060);

    #[test]
    fn test_missing_current_is_first_time_setup() {
        for new in [ATLANTA, NEW_YORK, Coordinate::new(-45.0, 170.0)] {
            assert_eq!(
                decide(new, None, DEFAULT_CHANGE_THRESHOLD_KM),
                ChangeDecision::FirstTimeSetup
            );
        }
    }

    #[test]
    fn test_small_move_is_unchanged() {
        let nearby = Coordinate::new(33.8, -84.4);
        match decide(nearby, Some(ATLANTA), DEFAULT_CHANGE_THRESHOLD_KM) {
            ChangeDecision::Unchanged(d) => assert!(d > 5.0 && d < 7.0, "got {}", d),
            other => panic!("expected Unchanged, got {:?}", other),
        }
    }

    #[test]
    fn test_large_move_is_changed() {
        match decide(ATLANTA, Some(NEW_YORK), DEFAULT_CHANGE_THRESHOLD_KM) {
            ChangeDecision::Changed(d) => assert!(d > 1100.0 && d < 1300.0, "got {}", d),
            other => panic!("expected Changed, got {:?}", other),
        }
    }

    #[test]
    fn test_distance_equal_to_threshold_is_unchanged() {
        let a = Coordinate::new(10.0, 10.0);
        let b = Coordinate::new(10.5, 10.5);
        let exact = distance_km(a, b);

        assert_eq!(decide(a, Some(b), exact), ChangeDecision::Unchanged(exact));
        assert_eq!(
            decide(a, Some(b), exact - 0.001),
            ChangeDecision::Changed(exact)
        );
    }

    #[test]
    fn test_requires_update() {
        assert!(ChangeDecision::FirstTimeSetup.requires_update());
        assert!(ChangeDecision::Changed(150.0).requires_update());
        assert!(!ChangeDecision::Unchanged(3.0).requires_update());
    }
}
