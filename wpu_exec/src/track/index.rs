//! # Track Index
//!
//! Spatial index over the 2D positions of the track waypoints, implemented as a point quadtree
//! (see [the wikipedia article](https://en.wikipedia.org/wiki/Quadtree)). The index only answers
//! nearest-by-position queries, it knows nothing about the track being a loop.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use util::raise_error;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Number of points per node before it is subdivided
pub const CAPACITY: usize = 4;

/// Nodes at this depth are never subdivided, so coincident points cannot recurse forever.
const MAX_DEPTH: usize = 20;

/// Padding added around the bounding box of the points when sizing the root node.
///
/// Units: meters
const BOUNDARY_PAD_M: f64 = 1.0;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Represents a quad with a centre and half-width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    centre: Vector2<f64>,
    half_width: f64,
}

/// Nearest-point index over the track waypoint positions.
#[derive(Clone, Debug)]
pub struct TrackIndex {
    root: Node,

    num_points: usize,
}

/// A node of the quadtree
#[derive(Clone, Debug)]
struct Node {
    /// The bounds of this node
    boundary: Quad,

    /// Depth of this node, the root is at zero
    depth: usize,

    /// Points stored in this node, with their index in the track
    points: Vec<(Vector2<f64>, usize)>,

    /// Children of the node in north west, north east, south west, south east order
    children: Option<Box<[Node; 4]>>,
}

/// Best candidate found so far by a nearest query, as (squared distance, index).
type Candidate = Option<(f64, usize)>;

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrackIndexError {
    #[error("Cannot build a track index from an empty sequence of points")]
    Empty,

    #[error("Point {0} of the track ({1}) is not finite")]
    NonFinitePoint(usize, Vector2<f64>),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Quad {
    /// Creates a new quad with the given `centre` and `half_width`.
    pub fn new(centre: Vector2<f64>, half_width: f64) -> Self {
        Self { centre, half_width }
    }

    /// Returns `true` if `point` is inside this [`Quad`], edges included.
    pub fn contains(&self, point: &Vector2<f64>) -> bool {
        (self.centre[0] - self.half_width) <= point[0]
            && (self.centre[0] + self.half_width) >= point[0]
            && (self.centre[1] - self.half_width) <= point[1]
            && (self.centre[1] + self.half_width) >= point[1]
    }

    /// Squared distance from `point` to the closest point of this [`Quad`], zero if the point is
    /// inside.
    pub fn dist_sq_to(&self, point: &Vector2<f64>) -> f64 {
        let dx = ((point[0] - self.centre[0]).abs() - self.half_width).max(0.0);
        let dy = ((point[1] - self.centre[1]).abs() - self.half_width).max(0.0);

        dx * dx + dy * dy
    }
}

impl TrackIndex {
    /// Build the index over the given positions.
    ///
    /// The index returned by [`TrackIndex::nearest`] is the index of the point in `positions`.
    pub fn build(positions: &[Vector2<f64>]) -> Result<Self, TrackIndexError> {
        if positions.is_empty() {
            return Err(TrackIndexError::Empty);
        }

        // Find the bounding box of all points
        let mut min = Vector2::new(std::f64::INFINITY, std::f64::INFINITY);
        let mut max = Vector2::new(std::f64::NEG_INFINITY, std::f64::NEG_INFINITY);
        for (i, p) in positions.iter().enumerate() {
            if !(p[0].is_finite() && p[1].is_finite()) {
                return Err(TrackIndexError::NonFinitePoint(i, *p));
            }
            min = min.inf(p);
            max = max.sup(p);
        }

        // Root is the square around the bounding box, padded so no point lies on its edge
        let extent = max - min;
        let boundary = Quad::new(
            (min + max) / 2.0,
            extent[0].max(extent[1]) / 2.0 + BOUNDARY_PAD_M,
        );

        let mut root = Node::new(boundary, 0);
        for (i, p) in positions.iter().enumerate() {
            root.insert(*p, i);
        }

        Ok(Self {
            root,
            num_points: positions.len(),
        })
    }

    /// Return the index of the point closest to `point`.
    ///
    /// If several points are equally close the lowest index is returned.
    pub fn nearest(&self, point: &Vector2<f64>) -> usize {
        let mut best: Candidate = None;
        self.root.nearest(point, &mut best);

        // An index always holds at least one point, so a candidate is always found
        match best {
            Some((_, i)) => i,
            None => raise_error!("TrackIndex is never empty"),
        }
    }

    /// Number of points in the index.
    pub fn len(&self) -> usize {
        self.num_points
    }

    /// Always false, an index cannot be built from no points.
    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }
}

impl Node {
    fn new(boundary: Quad, depth: usize) -> Self {
        Self {
            boundary,
            depth,
            points: Vec::new(),
            children: None,
        }
    }

    /// Insert a point into the node or one of its children.
    fn insert(&mut self, point: Vector2<f64>, idx: usize) {
        // If there's a space in the node and it's not been divided add it to the points list
        if self.children.is_none() && (self.points.len() < CAPACITY || self.depth >= MAX_DEPTH) {
            self.points.push((point, idx));
            return;
        }

        // Otherwise subdivide if needed
        if self.children.is_none() {
            self.subdivide();
        }

        // And add the point to the first child it will fit into
        if let Some(ref mut children) = self.children {
            if let Some(child) = children.iter_mut().find(|c| c.boundary.contains(&point)) {
                child.insert(point, idx);
                return;
            }
        }

        // Rounding in the child boundaries can leave a point just outside all of them, keep it
        // here instead
        self.points.push((point, idx));
    }

    /// Recursive branch and bound nearest search.
    fn nearest(&self, point: &Vector2<f64>, best: &mut Candidate) {
        if let Some((best_dist_sq, _)) = *best {
            if self.boundary.dist_sq_to(point) > best_dist_sq {
                return;
            }
        }

        for (p, i) in self.points.iter() {
            let dist_sq = (p - point).norm_squared();
            let better = match *best {
                None => true,
                Some((d, bi)) => dist_sq < d || (dist_sq == d && *i < bi),
            };
            if better {
                *best = Some((dist_sq, *i));
            }
        }

        // Visit the closest children first so that the others are more likely to be pruned
        if let Some(ref children) = self.children {
            let mut order: Vec<(f64, &Node)> = children
                .iter()
                .map(|c| (c.boundary.dist_sq_to(point), c))
                .collect();
            order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            for (_, child) in order {
                child.nearest(point, best);
            }
        }
    }

    fn subdivide(&mut self) {
        let hw = self.boundary.half_width / 2.0;
        let c = self.boundary.centre;
        let d = self.depth + 1;

        self.children = Some(Box::new([
            Node::new(Quad::new(c + Vector2::new(-hw, hw), hw), d),
            Node::new(Quad::new(c + Vector2::new(hw, hw), hw), d),
            Node::new(Quad::new(c + Vector2::new(-hw, -hw), hw), d),
            Node::new(Quad::new(c + Vector2::new(hw, -hw), hw), d),
        ]));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Brute force nearest, lowest index on ties.
    fn linear_nearest(points: &[Vector2<f64>], point: &Vector2<f64>) -> usize {
        let mut best = 0;
        for (i, p) in points.iter().enumerate() {
            if (p - point).norm_squared() < (points[best] - point).norm_squared() {
                best = i;
            }
        }
        best
    }

    /// Points on a circle of the given radius
    fn circle(n: usize, radius: f64) -> Vec<Vector2<f64>> {
        (0..n)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / n as f64;
                Vector2::new(radius * a.cos() + 1000.0, radius * a.sin() - 250.0)
            })
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(matches!(
            TrackIndex::build(&[]),
            Err(TrackIndexError::Empty)
        ));
    }

    #[test]
    fn test_non_finite() {
        let points = vec![Vector2::new(0.0, 0.0), Vector2::new(std::f64::NAN, 1.0)];
        assert!(matches!(
            TrackIndex::build(&points),
            Err(TrackIndexError::NonFinitePoint(1, _))
        ));
    }

    #[test]
    fn test_single_point() {
        let index = TrackIndex::build(&[Vector2::new(3.0, 4.0)]).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.nearest(&Vector2::new(-100.0, 100.0)), 0);
    }

    #[test]
    fn test_matches_linear_search() {
        let points = circle(500, 80.0);
        let index = TrackIndex::build(&points).unwrap();

        // Query on a grid covering the inside and outside of the circle
        for xi in -12..=12 {
            for yi in -12..=12 {
                let q = Vector2::new(1000.0 + xi as f64 * 9.3, -250.0 + yi as f64 * 9.7);
                assert_eq!(index.nearest(&q), linear_nearest(&points, &q), "query {}", q);
            }
        }
    }

    #[test]
    fn test_exact_hits() {
        let points = circle(300, 25.0);
        let index = TrackIndex::build(&points).unwrap();

        for (i, p) in points.iter().enumerate() {
            assert_eq!(index.nearest(p), i);
        }
    }

    #[test]
    fn test_coincident_points() {
        // Many identical points must not subdivide forever, and ties resolve to the lowest index
        let mut points = vec![Vector2::new(5.0, 5.0); 50];
        points.push(Vector2::new(10.0, 10.0));
        let index = TrackIndex::build(&points).unwrap();

        assert_eq!(index.nearest(&Vector2::new(4.0, 4.0)), 0);
        assert_eq!(index.nearest(&Vector2::new(11.0, 11.0)), 50);
    }

    #[test]
    fn test_straight_line() {
        // Degenerate (zero height) bounding box
        let points: Vec<_> = (0..100).map(|i| Vector2::new(i as f64, 0.0)).collect();
        let index = TrackIndex::build(&points).unwrap();

        assert_eq!(index.nearest(&Vector2::new(41.3, 2.0)), 41);
        assert_eq!(index.nearest(&Vector2::new(41.7, -2.0)), 42);
        assert_eq!(index.nearest(&Vector2::new(-20.0, 0.0)), 0);
        assert_eq!(index.nearest(&Vector2::new(500.0, 0.0)), 99);
    }

    #[test]
    fn test_quad_dist() {
        let q = Quad::new(Vector2::new(0.0, 0.0), 1.0);
        assert!(q.contains(&Vector2::new(1.0, -1.0)));
        assert!(!q.contains(&Vector2::new(1.1, 0.0)));
        assert_eq!(q.dist_sq_to(&Vector2::new(0.5, 0.5)), 0.0);
        assert_eq!(q.dist_sq_to(&Vector2::new(3.0, 0.0)), 4.0);
        assert_eq!(q.dist_sq_to(&Vector2::new(4.0, 5.0)), 25.0);
    }
}
