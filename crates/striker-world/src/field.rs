//! Field geometry and named tactical zones.
//!
//! [`FieldGeometry`] starts out with the full-size field defaults and is
//! replaced exactly once by the first geometry packet.  Zones are derived on
//! demand from the current dimensions, so they always match the field the
//! cameras report.
//!
//! Zones are defined in the first (north-east) quadrant by a palette of ten
//! points and mirrored into the other three:
//!
//! ```text
//!   c─────────────b───────────a        a..j: first-quadrant palette
//!   │             │    CORNER │
//!   │   FRONT     │    e──────d
//!   │             │ 2ND/  GOAL│
//!   h─────────────g───f       │
//!   │   MIDDLE    │CEN│       │
//!   ┼─────────────┼───j───────i ← y = 0
//! ```

use serde::{Deserialize, Serialize};
use striker_types::{Point, Polygon};

/// Physical dimensions of the field, in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    pub line_width: f64,
    pub field_length: f64,
    pub field_width: f64,
    pub boundary_width: f64,
    pub referee_width: f64,
    pub goal_width: f64,
    pub goal_depth: f64,
    pub goal_wall_width: f64,
    pub center_circle_radius: f64,
    pub defense_radius: f64,
    pub defense_stretch: f64,
    pub free_kick_from_defense_dist: f64,
    pub penalty_spot_from_field_line_dist: f64,
    pub penalty_line_from_spot_dist: f64,
}

impl Default for FieldGeometry {
    fn default() -> Self {
        Self {
            line_width: 10.0,
            field_length: 9000.0,
            field_width: 6000.0,
            boundary_width: 250.0,
            referee_width: 425.0,
            goal_width: 1000.0,
            goal_depth: 180.0,
            goal_wall_width: 20.0,
            center_circle_radius: 500.0,
            defense_radius: 1000.0,
            defense_stretch: 500.0,
            free_kick_from_defense_dist: 200.0,
            penalty_spot_from_field_line_dist: 1000.0,
            penalty_line_from_spot_dist: 400.0,
        }
    }
}

/// Which end of the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    West,
    East,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::West => Side::East,
            Side::East => Side::West,
        }
    }

    /// `-1.0` for west, `1.0` for east.
    pub fn sign(self) -> f64 {
        match self {
            Side::West => -1.0,
            Side::East => 1.0,
        }
    }
}

/// Goal mouth points of one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub center: Point,
    pub north_post: Point,
    pub south_post: Point,
}

impl FieldGeometry {
    pub fn half_length(&self) -> f64 {
        self.field_length / 2.0
    }

    pub fn half_width(&self) -> f64 {
        self.field_width / 2.0
    }

    pub fn is_valid(&self) -> bool {
        let dims = [
            self.field_length,
            self.field_width,
            self.goal_width,
            self.defense_radius,
        ];
        dims.iter().all(|d| d.is_finite() && *d > 0.0)
    }

    pub fn goal(&self, side: Side) -> Goal {
        let x = side.sign() * self.half_length();
        let half_goal = self.goal_width / 2.0;
        Goal {
            center: Point::new(x, 0.0),
            north_post: Point::new(x, half_goal),
            south_post: Point::new(x, -half_goal),
        }
    }

    /// `true` when `p` lies on the playing surface (lines included).
    pub fn contains(&self, p: Point) -> bool {
        p.x.abs() <= self.half_length() && p.y.abs() <= self.half_width()
    }

    /// Clamp `p` onto the playing surface.
    pub fn clamp(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(-self.half_length(), self.half_length()),
            p.y.clamp(-self.half_width(), self.half_width()),
        )
    }

    fn palette(&self) -> Palette {
        let sx = self.half_length() / 4500.0;
        let sy = self.half_width() / 3000.0;
        let p = |x: f64, y: f64| Point::new(x * sx, y * sy);
        Palette {
            a: p(4500.0, 3000.0),
            b: p(2500.0, 3000.0),
            c: p(0.0, 3000.0),
            d: p(4500.0, 1500.0),
            e: p(4000.0, 1500.0),
            f: p(3500.0, 750.0),
            g: p(2500.0, 750.0),
            h: p(0.0, 750.0),
            i: p(4500.0, 0.0),
            j: p(3500.0, 0.0),
        }
    }

    /// Half-height of the central MIDDLE/CENTER band.
    pub fn middle_band(&self) -> f64 {
        self.palette().h.y
    }

    /// Polygon of `zone` on the current field.
    pub fn zone(&self, zone: FieldZone) -> Polygon {
        use FieldZone::*;
        let Palette { a, b, c, d, e, f, g, h, i, j } = self.palette();
        let (side, north) = zone.placement();
        let mirror = |p: Point, north: bool| {
            Point::new(p.x * side.sign(), if north { p.y } else { -p.y })
        };
        let q = |pts: &[Point]| -> Vec<Point> { pts.iter().map(|p| mirror(*p, north)).collect() };
        let band = |pts: &[(Point, bool)]| -> Vec<Point> {
            pts.iter().map(|(p, n)| mirror(*p, *n)).collect()
        };

        let vertices: Vec<Point> = match zone {
            WestNorthCorner | WestSouthCorner | EastNorthCorner | EastSouthCorner => q(&[a, b, e, d]),
            WestNorthSecondPost | WestSouthSecondPost | EastNorthSecondPost
            | EastSouthSecondPost => q(&[e, b, g, f]),
            WestNorthFront | WestSouthFront | EastNorthFront | EastSouthFront => q(&[b, c, h, g]),
            WestNorthGoal | WestSouthGoal | EastNorthGoal | EastSouthGoal => q(&[d, e, f, j, i]),
            WestCenter | EastCenter => band(&[(f, true), (g, true), (g, false), (f, false)]),
            WestMiddle | EastMiddle => band(&[(g, true), (h, true), (h, false), (g, false)]),
            West | East => band(&[(a, true), (c, true), (c, false), (a, false)]),
        };
        Polygon::new(vertices)
    }

    /// First zone (in [`FieldZone::ALL`] order) containing `p`.
    pub fn locate(&self, p: Point) -> Option<FieldZone> {
        FieldZone::ALL
            .iter()
            .copied()
            .find(|z| self.zone(*z).contains(p))
    }
}

struct Palette {
    a: Point,
    b: Point,
    c: Point,
    d: Point,
    e: Point,
    f: Point,
    g: Point,
    h: Point,
    i: Point,
    j: Point,
}

/// Named tactical regions of the field.
///
/// The two half-field zones [`FieldZone::West`] and [`FieldZone::East`]
/// cover everything the finer zones miss and come last in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldZone {
    WestNorthCorner,
    WestNorthSecondPost,
    WestNorthFront,
    WestNorthGoal,
    WestCenter,
    WestMiddle,
    WestSouthCorner,
    WestSouthSecondPost,
    WestSouthFront,
    WestSouthGoal,
    EastNorthCorner,
    EastNorthSecondPost,
    EastNorthFront,
    EastNorthGoal,
    EastCenter,
    EastMiddle,
    EastSouthCorner,
    EastSouthSecondPost,
    EastSouthFront,
    EastSouthGoal,
    West,
    East,
}

impl FieldZone {
    pub const ALL: [FieldZone; 22] = [
        FieldZone::WestNorthCorner,
        FieldZone::WestNorthSecondPost,
        FieldZone::WestNorthFront,
        FieldZone::WestNorthGoal,
        FieldZone::WestCenter,
        FieldZone::WestMiddle,
        FieldZone::WestSouthCorner,
        FieldZone::WestSouthSecondPost,
        FieldZone::WestSouthFront,
        FieldZone::WestSouthGoal,
        FieldZone::EastNorthCorner,
        FieldZone::EastNorthSecondPost,
        FieldZone::EastNorthFront,
        FieldZone::EastNorthGoal,
        FieldZone::EastCenter,
        FieldZone::EastMiddle,
        FieldZone::EastSouthCorner,
        FieldZone::EastSouthSecondPost,
        FieldZone::EastSouthFront,
        FieldZone::EastSouthGoal,
        FieldZone::West,
        FieldZone::East,
    ];

    /// Side of the field and whether the zone sits in the north half.
    fn placement(self) -> (Side, bool) {
        use FieldZone::*;
        match self {
            WestNorthCorner | WestNorthSecondPost | WestNorthFront | WestNorthGoal => (Side::West, true),
            WestSouthCorner | WestSouthSecondPost | WestSouthFront | WestSouthGoal => (Side::West, false),
            WestCenter | WestMiddle | West => (Side::West, true),
            EastNorthCorner | EastNorthSecondPost | EastNorthFront | EastNorthGoal => (Side::East, true),
            EastSouthCorner | EastSouthSecondPost | EastSouthFront | EastSouthGoal => (Side::East, false),
            EastCenter | EastMiddle | East => (Side::East, true),
        }
    }

    pub fn side(self) -> Side {
        self.placement().0
    }

    pub fn is_corner(self) -> bool {
        use FieldZone::*;
        matches!(
            self,
            WestNorthCorner | WestSouthCorner | EastNorthCorner | EastSouthCorner
        )
    }

    /// The MIDDLE zone of `side`.
    pub fn middle(side: Side) -> FieldZone {
        match side {
            Side::West => FieldZone::WestMiddle,
            Side::East => FieldZone::EastMiddle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goals_sit_on_the_goal_lines() {
        let field = FieldGeometry::default();
        let east = field.goal(Side::East);
        assert_eq!(east.center, Point::new(4500.0, 0.0));
        assert_eq!(east.north_post, Point::new(4500.0, 500.0));
        assert_eq!(field.goal(Side::West).south_post, Point::new(-4500.0, -500.0));
    }

    #[test]
    fn middle_zone_centres_are_mirrored() {
        let field = FieldGeometry::default();
        assert_eq!(field.zone(FieldZone::EastMiddle).center_point(), Point::new(1250.0, 0.0));
        assert_eq!(field.zone(FieldZone::WestMiddle).center_point(), Point::new(-1250.0, 0.0));
    }

    #[test]
    fn locate_finds_fine_zones_before_halves() {
        let field = FieldGeometry::default();
        assert_eq!(field.locate(Point::new(4300.0, 2800.0)), Some(FieldZone::EastNorthCorner));
        assert_eq!(field.locate(Point::new(-4300.0, -2800.0)), Some(FieldZone::WestSouthCorner));
        assert_eq!(field.locate(Point::new(1000.0, 100.0)), Some(FieldZone::EastMiddle));
        assert_eq!(field.locate(Point::new(-3000.0, 0.0)), Some(FieldZone::WestCenter));
        assert_eq!(field.locate(Point::new(1000.0, 2000.0)), Some(FieldZone::EastNorthFront));
        assert_eq!(field.locate(Point::new(9000.0, 0.0)), None);
    }

    #[test]
    fn zones_scale_with_the_field() {
        let field = FieldGeometry {
            field_length: 6000.0,
            field_width: 4000.0,
            ..FieldGeometry::default()
        };
        let corner = field.zone(FieldZone::EastNorthCorner);
        assert!(corner.vertices().contains(&Point::new(3000.0, 2000.0)));
        assert!((field.middle_band() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn clamp_keeps_points_on_the_field() {
        let field = FieldGeometry::default();
        assert_eq!(field.clamp(Point::new(6000.0, -4000.0)), Point::new(4500.0, -3000.0));
        assert!(field.contains(Point::new(4500.0, 3000.0)));
        assert!(!field.contains(Point::new(4501.0, 0.0)));
    }
}
