// Copyright 2021 Sergey Mechtaev

// This file is part of Blockworld.

// Blockworld is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Blockworld is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Blockworld.  If not, see <https://www.gnu.org/licenses/>.

//! Generic A\* over a lazily expanded unit-cost graph, with a wall-clock
//! timeout as the only cancellation point.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub struct SearchResult<N> {
    /// Start node first, goal node last.
    pub path: Vec<N>,
    pub cost: u32,
}

pub enum SearchOutcome<N> {
    Found(SearchResult<N>),
    TimedOut,
    Exhausted,
}

struct Node<N> {
    state: N,
    parent: Option<Rc<Node<N>>>,
    g: u32,
    f: u32,
    /// Monotone insertion counter; ties on `f` go to the older entry.
    seq: u64,
}

impl<N: Clone> Node<N> {
    fn extract_path(&self) -> Vec<N> {
        let mut path = vec![self.state.clone()];
        let mut current = self;
        while let Some(parent) = &current.parent {
            path.push(parent.state.clone());
            current = parent;
        }
        path.reverse();
        path
    }
}

// The heap is a max-heap, so the ordering is reversed: the best node is
// the one with the lowest f, then the lowest insertion number.
impl<N> Ord for Node<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<N> PartialOrd for Node<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<N> PartialEq for Node<N> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<N> Eq for Node<N> {}

/// A\* from `start`. Every edge costs one; `heuristic` must never
/// overestimate for the returned path to be optimal. The search gives up
/// cooperatively once `timeout` of wall-clock time has passed.
pub fn astar<N, S, H, G>(
    start: N,
    mut successors: S,
    mut heuristic: H,
    mut is_goal: G,
    timeout: Duration,
) -> SearchOutcome<N>
where
    N: Clone + Eq + Hash,
    S: FnMut(&N) -> Vec<N>,
    H: FnMut(&N) -> u32,
    G: FnMut(&N) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut open: BinaryHeap<Rc<Node<N>>> = BinaryHeap::new();
    let mut best: HashMap<N, u32> = HashMap::new();
    let mut seq: u64 = 0;

    let f = heuristic(&start);
    best.insert(start.clone(), 0);
    open.push(Rc::new(Node {
        state: start,
        parent: None,
        g: 0,
        f,
        seq,
    }));

    while let Some(node) = open.pop() {
        if Instant::now() > deadline {
            return SearchOutcome::TimedOut;
        }
        // a cheaper route to this state was found after this entry was
        // queued
        if best.get(&node.state).map_or(false, |&g| g < node.g) {
            continue;
        }
        if is_goal(&node.state) {
            return SearchOutcome::Found(SearchResult {
                path: node.extract_path(),
                cost: node.g,
            });
        }
        for successor in successors(&node.state) {
            let g = node.g + 1;
            if best.get(&successor).map_or(true, |&old| g < old) {
                best.insert(successor.clone(), g);
                seq += 1;
                let f = g + heuristic(&successor);
                open.push(Rc::new(Node {
                    state: successor,
                    parent: Some(node.clone()),
                    g,
                    f,
                    seq,
                }));
            }
        }
    }
    SearchOutcome::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_shortest_path() {
        // 1 -> 3 -> 9 -> 10 beats any +1 chain
        let outcome = astar(
            1u32,
            |&n| vec![n + 1, n * 3].into_iter().filter(|&m| m <= 20).collect(),
            |_| 0,
            |&n| n == 10,
            Duration::from_secs(5),
        );
        match outcome {
            SearchOutcome::Found(result) => {
                assert_eq!(result.cost, 3);
                assert_eq!(result.path, vec![1, 3, 9, 10]);
            }
            _ => panic!("expected a path"),
        }
    }

    #[test]
    fn start_can_be_the_goal() {
        match astar(7u32, |_| Vec::new(), |_| 0, |&n| n == 7, Duration::from_secs(5)) {
            SearchOutcome::Found(result) => {
                assert_eq!(result.cost, 0);
                assert_eq!(result.path, vec![7]);
            }
            _ => panic!("expected the trivial path"),
        }
    }

    #[test]
    fn exhausts_finite_graphs() {
        let outcome = astar(
            0u32,
            |&n| if n < 4 { vec![n + 1] } else { Vec::new() },
            |_| 0,
            |&n| n == 100,
            Duration::from_secs(5),
        );
        assert!(matches!(outcome, SearchOutcome::Exhausted));
    }

    #[test]
    fn aborts_on_timeout() {
        let outcome = astar(
            0u64,
            |&n| vec![n + 1, n + 2],
            |_| 0,
            |_| false,
            Duration::from_millis(0),
        );
        assert!(matches!(outcome, SearchOutcome::TimedOut));
    }

    #[test]
    fn an_informative_heuristic_does_not_change_the_cost() {
        let uninformed = astar(
            0i64,
            |&n| vec![n - 1, n + 1],
            |_| 0,
            |&n| n == 6,
            Duration::from_secs(5),
        );
        let informed = astar(
            0i64,
            |&n| vec![n - 1, n + 1],
            |&n| (6 - n).unsigned_abs() as u32,
            |&n| n == 6,
            Duration::from_secs(5),
        );
        match (uninformed, informed) {
            (SearchOutcome::Found(a), SearchOutcome::Found(b)) => {
                assert_eq!(a.cost, 6);
                assert_eq!(a.cost, b.cost);
            }
            _ => panic!("expected paths from both searches"),
        }
    }
}
