//! Dijkstra search over a dense visibility graph.
//!
//! Path cost is lexicographic: total Euclidean length first, then the
//! absolute heading change of the first leg relative to the direct bearing.
//! Lengths are compared after rounding to [`LENGTH_RESOLUTION`], so
//! mirror-image detours fall through to the heading tie-break and the
//! ordering stays total.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Resolution (mm) at which path lengths are compared.
pub const LENGTH_RESOLUTION: f64 = 1e-3;

/// Cost of a partial path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathCost {
    pub length: f64,
    /// Degrees turned away from the direct bearing on the first leg.
    pub turn: f64,
}

impl PathCost {
    pub const ZERO: PathCost = PathCost { length: 0.0, turn: 0.0 };

    pub fn compare(&self, other: &PathCost) -> Ordering {
        self.quantized_length()
            .total_cmp(&other.quantized_length())
            .then_with(|| self.turn.total_cmp(&other.turn))
    }

    fn quantized_length(&self) -> f64 {
        (self.length / LENGTH_RESOLUTION).round()
    }
}

#[derive(Debug, Clone, Copy)]
struct State {
    cost: PathCost,
    node: usize,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .cost
            .compare(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest path from `start` to `goal`.
///
/// `edge(a, b)` returns the length of the edge `a → b` or `None` when the
/// two nodes cannot see each other; `first_turn(b)` is the heading change of
/// a first leg `start → b`.  Returns the node sequence including both ends.
pub fn shortest_path<E, T>(
    node_count: usize,
    start: usize,
    goal: usize,
    mut edge: E,
    mut first_turn: T,
) -> Option<(Vec<usize>, PathCost)>
where
    E: FnMut(usize, usize) -> Option<f64>,
    T: FnMut(usize) -> f64,
{
    if start >= node_count || goal >= node_count {
        return None;
    }
    if start == goal {
        return Some((vec![start], PathCost::ZERO));
    }

    let mut best: Vec<Option<PathCost>> = vec![None; node_count];
    let mut prev: Vec<Option<usize>> = vec![None; node_count];
    let mut done = vec![false; node_count];
    best[start] = Some(PathCost::ZERO);

    let mut heap = BinaryHeap::new();
    heap.push(State { cost: PathCost::ZERO, node: start });

    while let Some(State { cost, node }) = heap.pop() {
        if done[node] {
            continue;
        }
        done[node] = true;
        if node == goal {
            break;
        }
        for next in 0..node_count {
            if next == node || done[next] {
                continue;
            }
            let Some(len) = edge(node, next) else {
                continue;
            };
            let candidate = PathCost {
                length: cost.length + len,
                turn: if node == start { first_turn(next) } else { cost.turn },
            };
            let better = best[next].is_none_or(|b| candidate.compare(&b) == Ordering::Less);
            if better {
                best[next] = Some(candidate);
                prev[next] = Some(node);
                heap.push(State { cost: candidate, node: next });
            }
        }
    }

    let total = best[goal]?;
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = prev[current]?;
        path.push(current);
    }
    path.reverse();
    Some((path, total))
}
