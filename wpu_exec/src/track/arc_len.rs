//! # Arc Length Table
//!
//! Cumulative along-track distance to every waypoint, so that the distance between any two
//! waypoints is a single subtraction.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::Serialize;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Table of cumulative distances along the track.
#[derive(Clone, Debug, Serialize)]
pub struct ArcLenTable {
    /// Distance from the first waypoint to each waypoint.
    ///
    /// Units: meters
    cumulative_m: Vec<f64>,

    /// Length of the segment joining the last waypoint back to the first.
    ///
    /// Units: meters
    closing_m: f64,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ArcLenError {
    #[error("Cannot build an arc length table from an empty sequence of points")]
    Empty,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl ArcLenTable {
    /// Build the table from the waypoint positions.
    pub fn build(positions: &[Vector3<f64>]) -> Result<Self, ArcLenError> {
        let (first, last) = match (positions.first(), positions.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(ArcLenError::Empty),
        };

        let mut cumulative_m = Vec::with_capacity(positions.len());
        cumulative_m.push(0.0);

        let mut total_m = 0.0;
        for seg in positions.windows(2) {
            total_m += (seg[1] - seg[0]).norm();
            cumulative_m.push(total_m);
        }

        Ok(Self {
            cumulative_m,
            closing_m: (first - last).norm(),
        })
    }

    /// Along-track distance from waypoint `from` to waypoint `to`, without wrapping.
    ///
    /// # Panics
    /// - If either index is out of range.
    ///
    /// Only meaningful for `from <= to`, otherwise the result is negative.
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.cumulative_m[to] - self.cumulative_m[from]
    }

    /// Forward along-track distance from waypoint `from` to waypoint `to`, going across the end
    /// of the loop if `to` is before `from`.
    ///
    /// # Panics
    /// - If either index is out of range.
    pub fn distance_ahead(&self, from: usize, to: usize) -> f64 {
        if from <= to {
            self.distance(from, to)
        } else {
            self.total_length_m() - self.distance(to, from)
        }
    }

    /// Distance from the first waypoint to waypoint `idx`, or `None` if out of range.
    pub fn cumulative(&self, idx: usize) -> Option<f64> {
        self.cumulative_m.get(idx).copied()
    }

    /// Length of the whole loop, including the closing segment.
    pub fn total_length_m(&self) -> f64 {
        self.cumulative_m.last().copied().unwrap_or(0.0) + self.closing_m
    }

    /// Number of entries in the table, equal to the number of waypoints.
    pub fn len(&self) -> usize {
        self.cumulative_m.len()
    }

    /// Always false, a table cannot be built from no points.
    pub fn is_empty(&self) -> bool {
        self.cumulative_m.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn square() -> Vec<Vector3<f64>> {
        // 10 x 20 rectangle with an extra point half way up the first long side
        vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::new(10.0, 10.0, 0.0),
            Vector3::new(10.0, 20.0, 0.0),
            Vector3::new(0.0, 20.0, 0.0),
        ]
    }

    #[test]
    fn test_empty() {
        assert!(matches!(ArcLenTable::build(&[]), Err(ArcLenError::Empty)));
    }

    #[test]
    fn test_cumulative() {
        let table = ArcLenTable::build(&square()).unwrap();

        assert_eq!(table.len(), 5);
        assert_eq!(table.cumulative(0), Some(0.0));
        assert_eq!(table.cumulative(1), Some(10.0));
        assert_eq!(table.cumulative(4), Some(40.0));
        assert_eq!(table.cumulative(5), None);
        assert_approx_eq!(table.total_length_m(), 60.0);

        // Monotonically non-decreasing
        for i in 1..table.len() {
            assert!(table.cumulative(i).unwrap() >= table.cumulative(i - 1).unwrap());
        }
    }

    #[test]
    fn test_includes_height() {
        let table = ArcLenTable::build(&[
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(3.0, 0.0, 4.0),
        ])
        .unwrap();
        assert_approx_eq!(table.distance(0, 1), 5.0);
    }

    #[test]
    fn test_distance_additive() {
        let points: Vec<_> = (0..50)
            .map(|i| {
                let t = i as f64 * 0.3;
                Vector3::new(t.cos() * 7.0, t.sin() * 3.0, 0.0)
            })
            .collect();
        let table = ArcLenTable::build(&points).unwrap();

        for i in (0..50).step_by(7) {
            for j in (i..50).step_by(5) {
                for k in (j..50).step_by(3) {
                    assert_approx_eq!(
                        table.distance(i, j) + table.distance(j, k),
                        table.distance(i, k)
                    );
                }
            }
        }
        assert_eq!(table.distance(12, 12), 0.0);
    }

    #[test]
    fn test_distance_ahead() {
        let table = ArcLenTable::build(&square()).unwrap();

        assert_approx_eq!(table.distance_ahead(1, 3), 20.0);
        assert_approx_eq!(table.distance_ahead(2, 2), 0.0);
        // 3 -> 4 -> 0 -> 1
        assert_approx_eq!(table.distance_ahead(3, 1), 10.0 + 20.0 + 10.0);
        assert_approx_eq!(table.distance_ahead(4, 0), 20.0);
    }
}
