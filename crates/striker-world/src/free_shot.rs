//! Open shooting lane towards the enemy goal.
//!
//! Every robot overlapping the triangle `ball → south post → north post`
//! casts an angular shadow seen from the ball.  Shadows are projected onto
//! the goal line, clipped to the goal mouth, merged (intervals that merely
//! touch count as overlapping), and the midpoint of the widest remaining gap
//! becomes the aim point.
//!
//! Every online robot counts, the shooter included.  A robot closer than its
//! own radius to the ball casts a shadow at least 90° wide, so one standing
//! just behind the ball closes the whole mouth.

use striker_types::{Point, TeamColor, ROBOT_DIAMETER};

use crate::snapshot::{circle_touches_polygon, WorldSnapshot};

/// Obstacle count at which a shot is no longer considered.
pub const DEFAULT_MAX_OBSTACLES: usize = 5;

/// Sort and merge intervals; `[a, b]` and `[b, c]` merge into `[a, c]`.
pub fn merge_intervals(mut intervals: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
    for (lo, hi) in intervals {
        match merged.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Gaps of `[min, max]` not covered by the (merged, sorted) `blocked` list.
fn free_gaps(blocked: &[(f64, f64)], min: f64, max: f64) -> Vec<(f64, f64)> {
    let mut gaps = Vec::new();
    let mut cursor = min;
    for &(lo, hi) in blocked {
        if lo > cursor {
            gaps.push((cursor, lo));
        }
        cursor = cursor.max(hi);
    }
    if cursor < max {
        gaps.push((cursor, max));
    }
    gaps
}

impl WorldSnapshot {
    /// Aim point on the enemy goal line, or `None` when no shot is on.
    ///
    /// No shot is computed when the opponent owns the ball, when the ball
    /// sits in a corner zone, or when `max_obstacles` or more robots stand in
    /// the shooting triangle.
    pub fn free_shot(&self, max_obstacles: usize) -> Option<Point> {
        let ball = self.ball.as_ref()?;
        if matches!(ball.owner, Some((team, _)) if team != self.ally) {
            return None;
        }
        if self.locate(ball.position).is_none_or(|z| z.is_corner()) {
            return None;
        }

        let goal = self.enemy_goal();
        let triangle = [goal.south_post, goal.north_post, ball.position];
        let radius = ROBOT_DIAMETER / 2.0;
        let obstacles: Vec<Point> = self
            .online_robots()
            .filter(|r| circle_touches_polygon(r.position, radius, &triangle))
            .map(|r| r.position)
            .collect();

        if obstacles.is_empty() {
            return Some(goal.center);
        }
        if obstacles.len() >= max_obstacles {
            return None;
        }

        let dx = goal.center.x - ball.position.x;
        let (min_y, max_y) = (goal.south_post.y, goal.north_post.y);
        let shadows = obstacles
            .iter()
            .map(|o| {
                let distance = o.distance(ball.position).max(radius);
                let spread = (radius / distance).atan();
                let bearing = ball.position.angle_to(*o).to_radians();
                let project = |angle: f64| ball.position.y + angle.tan() * dx;
                let (a, b) = (project(bearing + spread), project(bearing - spread));
                (a.min(b).clamp(min_y, max_y), a.max(b).clamp(min_y, max_y))
            })
            .collect();

        let merged = merge_intervals(shadows);
        free_gaps(&merged, min_y, max_y)
            .into_iter()
            .filter(|(lo, hi)| hi > lo)
            .max_by(|a, b| (a.1 - a.0).total_cmp(&(b.1 - b.0)))
            .map(|(lo, hi)| Point::new(goal.center.x, (lo + hi) / 2.0))
    }

    /// `true` when `team` is known to own the ball.
    pub fn owned_by(&self, team: TeamColor) -> bool {
        matches!(self.ball.as_ref().and_then(|b| b.owner), Some((t, _)) if t == team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldGeometry;
    use crate::snapshot::{BallSnapshot, RefereeState, RobotSnapshot};
    use striker_types::Role;

    fn snapshot(ball: Point, robots: &[(TeamColor, u32, Point)]) -> WorldSnapshot {
        WorldSnapshot {
            field: FieldGeometry::default(),
            ball: Some(BallSnapshot {
                position: ball,
                velocity: Point::ORIGIN,
                owner: None,
                last_update: 0.0,
                update_count: 1,
            }),
            robots: robots
                .iter()
                .map(|&(team, id, position)| RobotSnapshot {
                    id,
                    team,
                    position,
                    orientation: 0.0,
                    velocity: Point::ORIGIN,
                    role: Role::Unassigned,
                    online: true,
                    visible: true,
                    last_update: 0.0,
                    update_count: 1,
                })
                .collect(),
            referee: RefereeState::default(),
            ally: TeamColor::Blue,
            ally_plays_west: true,
        }
    }

    #[test]
    fn touching_intervals_merge() {
        let merged = merge_intervals(vec![(2.0, 3.0), (0.0, 1.0), (1.0, 2.0), (5.0, 6.0)]);
        assert_eq!(merged, vec![(0.0, 3.0), (5.0, 6.0)]);
    }

    #[test]
    fn gaps_cover_the_rest_of_the_mouth() {
        let gaps = free_gaps(&[(-200.0, 100.0)], -500.0, 500.0);
        assert_eq!(gaps, vec![(-500.0, -200.0), (100.0, 500.0)]);
        assert!(free_gaps(&[(-500.0, 500.0)], -500.0, 500.0).is_empty());
    }

    #[test]
    fn empty_lane_aims_at_goal_centre() {
        let snap = snapshot(Point::new(4000.0, 0.0), &[]);
        assert_eq!(snap.free_shot(DEFAULT_MAX_OBSTACLES), Some(Point::new(4500.0, 0.0)));
    }

    #[test]
    fn blocked_north_half_aims_south() {
        let snap = snapshot(
            Point::new(3000.0, 0.0),
            &[(TeamColor::Yellow, 1, Point::new(4000.0, 250.0))],
        );
        let aim = snap.free_shot(DEFAULT_MAX_OBSTACLES).expect("lane should be open");
        assert!((aim.x - 4500.0).abs() < 1e-9);
        assert!(aim.y < 0.0, "aim {aim:?} should be south of the blocker");
    }

    #[test]
    fn robot_hugging_the_ball_closes_the_mouth() {
        let ball = Point::new(3000.0, 0.0);
        let hugging = snapshot(ball, &[(TeamColor::Blue, 2, Point::new(2950.0, 0.0))]);
        assert_eq!(hugging.free_shot(DEFAULT_MAX_OBSTACLES), None);

        let clear = snapshot(ball, &[(TeamColor::Blue, 2, Point::new(2600.0, 0.0))]);
        assert_eq!(clear.free_shot(DEFAULT_MAX_OBSTACLES), Some(Point::new(4500.0, 0.0)));
    }

    #[test]
    fn crowded_triangle_has_no_shot() {
        let robots: Vec<_> = (0..5)
            .map(|i| (TeamColor::Yellow, i, Point::new(3600.0 + 150.0 * i as f64, 0.0)))
            .collect();
        let snap = snapshot(Point::new(3000.0, 0.0), &robots);
        assert_eq!(snap.free_shot(DEFAULT_MAX_OBSTACLES), None);
    }

    #[test]
    fn enemy_possession_or_corner_has_no_shot() {
        let mut snap = snapshot(Point::new(4000.0, 0.0), &[]);
        if let Some(ball) = snap.ball.as_mut() {
            ball.owner = Some((TeamColor::Yellow, 3));
        }
        assert_eq!(snap.free_shot(DEFAULT_MAX_OBSTACLES), None);

        let corner = snapshot(Point::new(4400.0, 2900.0), &[]);
        assert_eq!(corner.free_shot(DEFAULT_MAX_OBSTACLES), None);
    }
}
