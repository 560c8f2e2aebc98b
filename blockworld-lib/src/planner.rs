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

//! The planner: search nodes over `(held, stacks)`, legal pick/drop
//! successors, an admissible heuristic for DNF goals, and extraction of
//! the action sequence from the search path.
//!
//! The arm column is deliberately not part of the node: arm motion is
//! free for the cost model, which collapses the search graph. The plan
//! emitter reintroduces the arm movements afterwards.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use petgraph::graph::{Graph, NodeIndex};
use thiserror::Error;

use crate::logic::{Dnf, Literal, Relation};
use crate::physics;
use crate::search::{astar, SearchOutcome};
use crate::world::{FoundObject, ObjectId, Placement, WorldState};

/// A search node. Equality and hashing are by value; two arrangements
/// that differ only in arm position are the same node.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StateNode {
    pub holding: Option<ObjectId>,
    pub stacks: Vec<Vec<ObjectId>>,
}

impl StateNode {
    pub fn from_world(world: &WorldState) -> StateNode {
        StateNode {
            holding: world.holding.clone(),
            stacks: world.stacks.clone(),
        }
    }

    fn find(&self, id: &ObjectId, world: &WorldState) -> Option<FoundObject> {
        let description = world.description(id)?;
        if id.is_floor() {
            return Some(FoundObject {
                description,
                placement: Placement::Floor,
            });
        }
        if self.holding.as_ref() == Some(id) {
            return Some(FoundObject {
                description,
                placement: Placement::Held,
            });
        }
        for (stack, column) in self.stacks.iter().enumerate() {
            if let Some(height) = column.iter().position(|o| o == id) {
                return Some(FoundObject {
                    description,
                    placement: Placement::Stacked { stack, height },
                });
            }
        }
        None
    }

    fn above_count(&self, id: &ObjectId) -> u32 {
        for column in &self.stacks {
            if let Some(height) = column.iter().position(|o| o == id) {
                return (column.len() - 1 - height) as u32;
            }
        }
        0
    }

    fn stack_of(&self, id: &ObjectId) -> Option<usize> {
        self.stacks
            .iter()
            .position(|column| column.iter().any(|o| o == id))
    }

    fn is_held(&self, id: &ObjectId) -> bool {
        self.holding.as_ref() == Some(id)
    }
}

impl fmt::Display for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.stacks.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "[")?;
            for (j, id) in column.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", id)?;
            }
            write!(f, "]")?;
        }
        if let Some(held) = &self.holding {
            write!(f, " holding={}", held)?;
        }
        Ok(())
    }
}

/// Physically legal transitions: with a free gripper, pop any stack top;
/// with a held object, drop it wherever the stacking laws permit. Every
/// transition is one action.
pub fn successors(node: &StateNode, world: &WorldState) -> Vec<StateNode> {
    let mut out = Vec::new();
    match &node.holding {
        None => {
            for (i, column) in node.stacks.iter().enumerate() {
                if let Some(top) = column.last() {
                    let mut stacks = node.stacks.clone();
                    stacks[i].pop();
                    out.push(StateNode {
                        holding: Some(top.clone()),
                        stacks,
                    });
                }
            }
        }
        Some(held) => {
            let held_description = match world.description(held) {
                Some(d) => d,
                None => return out,
            };
            for (i, column) in node.stacks.iter().enumerate() {
                let allowed = match column.last() {
                    // an empty column is the bare floor
                    None => true,
                    Some(top) => world
                        .description(top)
                        .map_or(false, |d| physics::is_stacking_allowed(&held_description, &d)),
                };
                if allowed {
                    let mut stacks = node.stacks.clone();
                    stacks[i].push(held.clone());
                    out.push(StateNode {
                        holding: None,
                        stacks,
                    });
                }
            }
        }
    }
    out
}

fn literal_holds(literal: &Literal, node: &StateNode, world: &WorldState) -> bool {
    let a = match node.find(&literal.args[0], world) {
        Some(a) => a,
        None => return false,
    };
    let b = literal.args.get(1).and_then(|id| node.find(id, world));
    if literal.args.len() > 1 && b.is_none() {
        return false;
    }
    let c = literal.args.get(2).and_then(|id| node.find(id, world));
    if literal.args.len() > 2 && c.is_none() {
        return false;
    }
    let holds = physics::has_valid_location(&a, literal.relation, b.as_ref(), c.as_ref());
    holds == literal.polarity
}

/// A node is a goal when some disjunct holds outright.
pub fn is_goal(node: &StateNode, dnf: &Dnf, world: &WorldState) -> bool {
    dnf.0.iter().any(|conjunction| {
        conjunction
            .0
            .iter()
            .all(|literal| literal_holds(literal, node, world))
    })
}

/// Lower bound on the number of pick/drop actions still needed: per
/// conjunction the hardest literal, over the DNF the cheapest
/// conjunction. Arm motion is free, so only pick/drop pairs count.
pub fn heuristic(node: &StateNode, dnf: &Dnf, world: &WorldState) -> u32 {
    dnf.0
        .iter()
        .map(|conjunction| {
            conjunction
                .0
                .iter()
                .map(|literal| literal_bound(literal, node, world))
                .max()
                .unwrap_or(0)
        })
        .min()
        .unwrap_or(0)
}

// Subject and target clearing costs count the same moves when both rest
// in one stack, hence max instead of sum there.
fn combine(subject: u32, target: u32, shared_stack: bool) -> u32 {
    if shared_stack {
        subject.max(target)
    } else {
        subject + target
    }
}

fn literal_bound(literal: &Literal, node: &StateNode, world: &WorldState) -> u32 {
    if literal_holds(literal, node, world) {
        return 0;
    }
    let a = &literal.args[0];
    match literal.relation {
        Relation::Holding => 2 * node.above_count(a) + 1,
        Relation::LeftOf | Relation::RightOf | Relation::Beside => {
            let b = &literal.args[1];
            let moves = !node.is_held(a) as u32 + !node.is_held(b) as u32;
            moves + 2 * node.above_count(a).min(node.above_count(b))
        }
        Relation::OnTop | Relation::Inside => {
            let b = &literal.args[1];
            let subject = if node.is_held(a) {
                1
            } else {
                2 * node.above_count(a) + 2
            };
            let target = if b.is_floor() {
                2 * node
                    .stacks
                    .iter()
                    .map(|column| column.len() as u32)
                    .min()
                    .unwrap_or(0)
            } else if node.is_held(b) {
                1
            } else {
                2 * node.above_count(b)
            };
            let shared = node.stack_of(a).is_some() && node.stack_of(a) == node.stack_of(b);
            combine(subject, target, shared)
        }
        Relation::Under => {
            // the target must be placed above the subject
            let b = &literal.args[1];
            let target = if node.is_held(b) {
                1
            } else {
                2 * node.above_count(b) + 2
            };
            target + node.is_held(a) as u32
        }
        Relation::Above => {
            let b = &literal.args[1];
            let subject = if node.is_held(a) {
                1
            } else {
                2 * node.above_count(a) + 2
            };
            subject + node.is_held(b) as u32
        }
        Relation::Between => {
            // moving any one participant can satisfy the relation, so
            // only the cheapest clearing is a lower bound; a held
            // participant clears for free and costs the single drop
            let b = &literal.args[1];
            let c = &literal.args[2];
            let clearing = node
                .above_count(a)
                .min(node.above_count(b))
                .min(node.above_count(c));
            1 + 2 * clearing
        }
    }
}

/// An atomic arm instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Left,
    Right,
    Pick,
    Drop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Left => write!(f, "l"),
            Action::Right => write!(f, "r"),
            Action::Pick => write!(f, "p"),
            Action::Drop => write!(f, "d"),
        }
    }
}

/// One output line: an atomic action, or narration for the user.
/// Executors consume the actions and ignore the narration.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PlanStep {
    Action(Action),
    Narration(String),
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStep::Action(a) => write!(f, "{}", a),
            PlanStep::Narration(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum PlanError {
    #[error("Search for goal timed out!")]
    SearchTimeout,
    #[error("no plan found for goal")]
    NoPlanFound,
    #[error("internal planner error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug)]
pub struct PlanOptions {
    pub timeout: Duration,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions {
            timeout: Duration::from_millis(10_000),
        }
    }
}

/// Turn a search path into arm instructions interleaved with narration.
pub fn emit_plan(
    path: &[StateNode],
    start_arm: usize,
    world: &WorldState,
) -> Result<Vec<PlanStep>, PlanError> {
    if path.len() <= 1 {
        return Ok(vec![PlanStep::Narration("That is already true!".to_owned())]);
    }
    let mut steps = Vec::new();
    let mut arm = start_arm;
    for window in path.windows(2) {
        let (prev, next) = (&window[0], &window[1]);
        let picking = prev.holding.is_none();
        let column = if picking {
            prev.stacks
                .iter()
                .zip(&next.stacks)
                .position(|(p, n)| p.len() == n.len() + 1)
        } else {
            prev.stacks
                .iter()
                .zip(&next.stacks)
                .position(|(p, n)| p.len() + 1 == n.len())
        }
        .ok_or_else(|| {
            PlanError::Internal("consecutive search states differ in no stack".to_owned())
        })?;
        let id = if picking {
            next.holding.clone()
        } else {
            prev.holding.clone()
        }
        .ok_or_else(|| {
            PlanError::Internal("pick/drop transition without a held object".to_owned())
        })?;

        if arm > column {
            steps.push(PlanStep::Narration("Moving left".to_owned()));
            steps.extend((column..arm).map(|_| PlanStep::Action(Action::Left)));
        } else if arm < column {
            steps.push(PlanStep::Narration("Moving right".to_owned()));
            steps.extend((arm..column).map(|_| PlanStep::Action(Action::Right)));
        }
        arm = column;

        let description = physics::minimal_description(&id, world);
        if picking {
            steps.push(PlanStep::Narration(format!("Picking up the {}", description)));
            steps.push(PlanStep::Action(Action::Pick));
        } else {
            steps.push(PlanStep::Narration(format!("Dropping the {}", description)));
            steps.push(PlanStep::Action(Action::Drop));
        }
    }
    Ok(steps)
}

/// Plan a goal formula against a world.
pub fn plan(
    dnf: &Dnf,
    world: &WorldState,
    options: &PlanOptions,
) -> Result<Vec<PlanStep>, PlanError> {
    if dnf.is_unsatisfiable() {
        return Err(PlanError::NoPlanFound);
    }
    let start = StateNode::from_world(world);
    match astar(
        start,
        |n| successors(n, world),
        |n| heuristic(n, dnf, world),
        |n| is_goal(n, dnf, world),
        options.timeout,
    ) {
        SearchOutcome::Found(result) => emit_plan(&result.path, world.arm, world),
        SearchOutcome::TimedOut => Err(PlanError::SearchTimeout),
        SearchOutcome::Exhausted => Err(PlanError::NoPlanFound),
    }
}

/// Like [`plan`], but also captures every expanded transition as a graph
/// for debugging output.
pub fn plan_with_graph(
    dnf: &Dnf,
    world: &WorldState,
    options: &PlanOptions,
) -> (Graph<String, ()>, Result<Vec<PlanStep>, PlanError>) {
    let mut graph = Graph::<String, ()>::new();
    if dnf.is_unsatisfiable() {
        return (graph, Err(PlanError::NoPlanFound));
    }
    let mut indices: HashMap<StateNode, NodeIndex> = HashMap::new();
    let start = StateNode::from_world(world);
    let outcome = astar(
        start,
        |n: &StateNode| {
            let children = successors(n, world);
            let from = *indices
                .entry(n.clone())
                .or_insert_with(|| graph.add_node(n.to_string()));
            for child in &children {
                let to = *indices
                    .entry(child.clone())
                    .or_insert_with(|| graph.add_node(child.to_string()));
                graph.update_edge(from, to, ());
            }
            children
        },
        |n| heuristic(n, dnf, world),
        |n| is_goal(n, dnf, world),
        options.timeout,
    );
    let result = match outcome {
        SearchOutcome::Found(result) => emit_plan(&result.path, world.arm, world),
        SearchOutcome::TimedOut => Err(PlanError::SearchTimeout),
        SearchOutcome::Exhausted => Err(PlanError::NoPlanFound),
    };
    (graph, result)
}

/// Test support: execute a plan's actions over a world.
#[cfg(test)]
pub(crate) fn apply_plan(world: &WorldState, steps: &[PlanStep]) -> WorldState {
    let mut world = world.clone();
    for step in steps {
        if let PlanStep::Action(action) = step {
            match action {
                Action::Left => world.arm -= 1,
                Action::Right => world.arm += 1,
                Action::Pick => {
                    let id = world.stacks[world.arm].pop().expect("pick from empty stack");
                    world.holding = Some(id);
                }
                Action::Drop => {
                    let id = world.holding.take().expect("drop with empty gripper");
                    world.stacks[world.arm].push(id);
                }
            }
        }
    }
    world
}
