//! `striker-planner` – obstacle-avoiding routes on the field.
//!
//! [`plan`] builds a visibility graph from the start, the goal and a ring of
//! waypoints around every obstacle in the way, then runs Dijkstra over it.
//!
//! - Obstacles are circles inflated by the robot radius.
//! - Ring waypoints sit on a regular polygon circumscribing a slightly
//!   enlarged circle, so the polygon edges clear the obstacle.  They stand in
//!   for the exact tangent points: a detour around one obstacle comes out a
//!   fraction of a percent longer than the true shortest path.
//! - Waypoints outside the field bounds or inside another obstacle are
//!   dropped.
//! - An obstacle containing the start (goal) is ignored for legs leaving the
//!   start (reaching the goal).
//! - Equal-length routes are split by the smaller heading change of the
//!   first leg relative to the direct bearing.
//! - When nothing connects, the direct line is returned with
//!   [`Route::fallback`] set.
//!
//! # Example
//!
//! ```rust
//! use striker_planner::{plan, Bounds};
//! use striker_types::{Circle, Point};
//!
//! let bounds = Bounds::new(Point::new(-4500.0, -3000.0), Point::new(4500.0, 3000.0));
//! let blocker = Circle::new(Point::new(0.0, 0.0), 90.0);
//! let route = plan(Point::new(-1000.0, 0.0), Point::new(1000.0, 0.0), &[blocker], 90.0, bounds);
//! assert!(!route.fallback);
//! assert!(route.waypoints.len() > 1);
//! assert_eq!(route.waypoints.last(), Some(&Point::new(1000.0, 0.0)));
//! ```

pub mod dijkstra;

use serde::{Deserialize, Serialize};
use striker_types::geometry::{angle_difference, segment_distance};
use striker_types::{Circle, Point};
use tracing::debug;

use crate::dijkstra::shortest_path;

/// Waypoints placed around each obstacle.
pub const RING_VERTICES: usize = 16;

/// Relative enlargement of the ring over the inflated obstacle.
pub const CLEARANCE_MARGIN: f64 = 0.05;

/// Axis-aligned region waypoints must stay in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Bounds centred on the origin.
    pub fn centered(half_length: f64, half_width: f64) -> Self {
        Self::new(
            Point::new(-half_length, -half_width),
            Point::new(half_length, half_width),
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// A planned path.  `waypoints` excludes the start and ends at the goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub start: Point,
    pub waypoints: Vec<Point>,
    /// `true` when no collision-free path was found and the direct line was
    /// returned instead.
    pub fallback: bool,
}

impl Route {
    fn direct(start: Point, goal: Point, fallback: bool) -> Self {
        Self {
            start,
            waypoints: vec![goal],
            fallback,
        }
    }

    /// Total travel distance.
    pub fn length(&self) -> f64 {
        let mut from = self.start;
        let mut total = 0.0;
        for p in &self.waypoints {
            total += from.distance(*p);
            from = *p;
        }
        total
    }

    /// The point to drive towards right now.
    pub fn next_waypoint(&self) -> Option<Point> {
        self.waypoints.first().copied()
    }

    pub fn goal(&self) -> Option<Point> {
        self.waypoints.last().copied()
    }
}

const START: usize = 0;
const GOAL: usize = 1;

struct Graph {
    nodes: Vec<Point>,
    obstacles: Vec<Circle>,
    start_inside: Vec<bool>,
    goal_inside: Vec<bool>,
}

impl Graph {
    fn new(start: Point, goal: Point, obstacles: Vec<Circle>) -> Self {
        let start_inside = obstacles.iter().map(|o| o.contains(start)).collect();
        let goal_inside = obstacles.iter().map(|o| o.contains(goal)).collect();
        Self {
            nodes: vec![start, goal],
            obstacles,
            start_inside,
            goal_inside,
        }
    }

    fn add_ring(&mut self, obstacle: Circle, bounds: Bounds) {
        let step = 360.0 / RING_VERTICES as f64;
        let ring = obstacle.radius * (1.0 + CLEARANCE_MARGIN) / (step / 2.0).to_radians().cos();
        for k in 0..RING_VERTICES {
            let p = obstacle.center.translate(step * k as f64, ring);
            if bounds.contains(p) && !self.obstacles.iter().any(|o| o.contains(p)) {
                self.nodes.push(p);
            }
        }
    }

    fn visible(&self, a: usize, b: usize) -> bool {
        let (pa, pb) = (self.nodes[a], self.nodes[b]);
        self.obstacles.iter().enumerate().all(|(i, o)| {
            let ignored = ((a == START || b == START) && self.start_inside[i])
                || ((a == GOAL || b == GOAL) && self.goal_inside[i]);
            ignored || !o.intersects_segment(pa, pb)
        })
    }

    fn search(&self) -> Option<Vec<Point>> {
        let start = self.nodes[START];
        let bearing = start.angle_to(self.nodes[GOAL]);
        let (path, _) = shortest_path(
            self.nodes.len(),
            START,
            GOAL,
            |a, b| self.visible(a, b).then(|| self.nodes[a].distance(self.nodes[b])),
            |b| angle_difference(start.angle_to(self.nodes[b]), bearing).abs(),
        )?;
        Some(path.into_iter().skip(1).map(|i| self.nodes[i]).collect())
    }
}

/// Obstacles blocking the direct line, plus every obstacle chained to one of
/// them by overlapping rings.
fn relevant_obstacles(start: Point, goal: Point, obstacles: &[Circle]) -> Vec<usize> {
    let mut chosen: Vec<usize> = (0..obstacles.len())
        .filter(|&i| segment_distance(start, goal, obstacles[i].center) < obstacles[i].radius)
        .collect();
    let mut cursor = 0;
    while cursor < chosen.len() {
        let current = obstacles[chosen[cursor]];
        for (i, o) in obstacles.iter().enumerate() {
            let reach = (current.radius + o.radius) * (1.0 + 2.0 * CLEARANCE_MARGIN);
            if !chosen.contains(&i) && current.center.distance(o.center) < reach {
                chosen.push(i);
            }
        }
        cursor += 1;
    }
    chosen
}

/// Plan a route from `start` to `goal` around `obstacles`.
///
/// Each obstacle radius is inflated by `robot_radius`.
pub fn plan(
    start: Point,
    goal: Point,
    obstacles: &[Circle],
    robot_radius: f64,
    bounds: Bounds,
) -> Route {
    let inflated: Vec<Circle> = obstacles
        .iter()
        .filter(|o| o.center.is_finite() && o.radius.is_finite())
        .map(|o| Circle::new(o.center, o.radius + robot_radius))
        .collect();

    let mut graph = Graph::new(start, goal, inflated.clone());
    if graph.visible(START, GOAL) {
        return Route::direct(start, goal, false);
    }

    let relevant = relevant_obstacles(start, goal, &inflated);
    for &i in &relevant {
        graph.add_ring(inflated[i], bounds);
    }
    if let Some(waypoints) = graph.search() {
        return Route { start, waypoints, fallback: false };
    }

    if relevant.len() < inflated.len() {
        let mut full = Graph::new(start, goal, inflated.clone());
        for o in &inflated {
            full.add_ring(*o, bounds);
        }
        if let Some(waypoints) = full.search() {
            return Route { start, waypoints, fallback: false };
        }
    }

    debug!(?start, ?goal, obstacles = inflated.len(), "no free route; falling back to direct line");
    Route::direct(start, goal, true)
}
