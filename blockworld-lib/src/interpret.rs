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

//! Semantic interpretation: from a parsed command and a world to a DNF
//! goal formula.
//!
//! Reference resolution walks the entity tree and collects, per noun
//! phrase, every identifier that could bind to it. Formula construction
//! then crosses those candidate sets according to the quantifiers:
//! `any`/`the` pick one binding per disjunct, `all` demands coverage of
//! the whole candidate set. `the` additionally requires the final
//! formula to pin down a unique referent, otherwise a clarification
//! question is raised.

use std::collections::HashMap;

use itertools::{iproduct, Itertools};
use thiserror::Error;

use crate::grammar::{Command, Entity, Location, Object, Quantifier};
use crate::logic::{Conjunction, Dnf, Literal, Relation};
use crate::physics;
use crate::world::{ObjectId, WorldState};

#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum InterpretError {
    #[error("Sentence has no valid interpretation in world")]
    NoValidInterpretation,
    #[error("Only one object can be held at a time!")]
    OneObjectAtATime,
    #[error("An ambiguity exists, did you mean: {}", format_alternatives(.0))]
    Clarify(Vec<String>),
    #[error("the description \"{0}\" does not single out one object")]
    DescriptionAmbiguous(String),
    #[error("internal interpreter error: {0}")]
    Internal(String),
}

fn format_alternatives(descriptions: &[String]) -> String {
    descriptions.iter().map(|d| format!("- {}?", d)).join(" ")
}

/// Candidate bindings for one noun phrase, with the nested candidate
/// sets kept for inspection and debugging output.
#[derive(Clone, PartialEq, Debug)]
pub struct Candidates {
    pub main: Vec<ObjectId>,
    pub relation: Option<Relation>,
    pub nested: Option<Box<Candidates>>,
    pub nested2: Option<Box<Candidates>>,
}

/// Resolve a quantified noun phrase to its candidate identifiers.
pub fn resolve_entity(entity: &Entity, world: &WorldState) -> Candidates {
    resolve_object(&entity.object, world)
}

fn resolve_object(object: &Object, world: &WorldState) -> Candidates {
    match object {
        Object::Leaf(descriptor) => {
            let main = world
                .existing_ids()
                .into_iter()
                .filter(|id| {
                    world
                        .description(id)
                        .map_or(false, |d| physics::matches_description(descriptor, &d))
                })
                .collect();
            Candidates {
                main,
                relation: None,
                nested: None,
                nested2: None,
            }
        }
        Object::Nested { object, location } => {
            let inner = resolve_object(object, world);
            let nested = resolve_entity(&location.entity, world);
            let nested2 = location
                .entity2
                .as_ref()
                .map(|e| resolve_entity(e, world));
            // Tie-breaks between bindings of the nested quantifier are
            // deferred; one witness binding is enough to keep a candidate.
            let main = inner
                .main
                .into_iter()
                .filter(|id| {
                    let a = match world.find(id) {
                        Some(a) => a,
                        None => return false,
                    };
                    nested.main.iter().any(|b_id| {
                        let b = match world.find(b_id) {
                            Some(b) => b,
                            None => return false,
                        };
                        match &nested2 {
                            Some(n2) => n2.main.iter().any(|c_id| {
                                world.find(c_id).map_or(false, |c| {
                                    physics::has_valid_location(
                                        &a,
                                        location.relation,
                                        Some(&b),
                                        Some(&c),
                                    )
                                })
                            }),
                            None => physics::has_valid_location(
                                &a,
                                location.relation,
                                Some(&b),
                                None,
                            ),
                        }
                    })
                })
                .collect();
            Candidates {
                main,
                relation: Some(location.relation),
                nested: Some(Box::new(nested)),
                nested2: nested2.map(Box::new),
            }
        }
    }
}

/// Interpret a command against a world, producing the goal formula or a
/// typed interpretation failure.
pub fn interpret(command: &Command, world: &WorldState) -> Result<Dnf, InterpretError> {
    let dnf = build_formula(command, world)?;
    if dnf.is_unsatisfiable() {
        return Err(InterpretError::NoValidInterpretation);
    }
    check_clarification(command, &dnf, world)?;
    Ok(dnf)
}

fn build_formula(command: &Command, world: &WorldState) -> Result<Dnf, InterpretError> {
    match command {
        Command::Take { entity } => {
            let candidates = resolve_entity(entity, world);
            let mains: Vec<&ObjectId> = candidates
                .main
                .iter()
                .filter(|id| !id.is_floor())
                .collect();
            if entity.quantifier == Quantifier::All && mains.len() > 1 {
                return Err(InterpretError::OneObjectAtATime);
            }
            Ok(Dnf(mains
                .into_iter()
                .map(|m| {
                    Conjunction(vec![Literal::positive(
                        Relation::Holding,
                        vec![m.clone()],
                    )])
                })
                .collect()))
        }
        Command::Put { location } => {
            let targets: Vec<ObjectId> = world.holding.iter().cloned().collect();
            location_formula(&targets, false, location, world)
        }
        Command::Move { entity, location } => {
            let targets = resolve_entity(entity, world).main;
            location_formula(
                &targets,
                entity.quantifier == Quantifier::All,
                location,
                world,
            )
        }
    }
}

fn location_formula(
    targets: &[ObjectId],
    targets_all: bool,
    location: &Location,
    world: &WorldState,
) -> Result<Dnf, InterpretError> {
    let relation = location.relation;
    let goals = resolve_entity(&location.entity, world).main;
    let conjunctions = if relation == Relation::Between {
        let entity2 = location.entity2.as_deref().ok_or_else(|| {
            InterpretError::Internal("between without a second reference".to_owned())
        })?;
        let goals2 = resolve_entity(entity2, world).main;
        let mask = (
            targets_all,
            location.entity.quantifier == Quantifier::All,
            entity2.quantifier == Quantifier::All,
        );
        if mask == (false, false, false) {
            between_any(targets, &goals, &goals2, world)
        } else {
            between_all(mask, targets, &goals, &goals2, world)
        }
    } else {
        let goals_all = location.entity.quantifier == Quantifier::All;
        if !targets_all && !goals_all {
            binary_any(relation, targets, &goals, world)
        } else {
            binary_all(relation, targets, targets_all, &goals, goals_all, world)
        }
    };
    Ok(Dnf(
        conjunctions
            .into_iter()
            .filter(supports_single_child)
            .collect(),
    ))
}

fn feasible(literal: &Literal, world: &WorldState) -> bool {
    physics::is_valid_goal_location(
        world,
        &literal.args[0],
        literal.relation,
        literal.args.get(1),
        literal.args.get(2),
    )
}

fn binary_any(
    relation: Relation,
    targets: &[ObjectId],
    goals: &[ObjectId],
    world: &WorldState,
) -> Vec<Conjunction> {
    iproduct!(targets, goals)
        .map(|(t, g)| Literal::positive(relation, vec![t.clone(), g.clone()]))
        .filter(|lit| feasible(lit, world))
        .map(|lit| Conjunction(vec![lit]))
        .collect()
}

/// Enumerate every mapping from the `all` side into the choice side
/// (`choices^alls` assignments, repetition allowed) and keep the
/// conjunctions whose literals are all feasible.
fn assignment_conjunctions<F>(
    world: &WorldState,
    alls: usize,
    choices: usize,
    literal_for: F,
) -> Vec<Conjunction>
where
    F: Fn(usize, usize) -> Literal,
{
    if alls == 0 || choices == 0 {
        return Vec::new();
    }
    (0..alls)
        .map(|_| 0..choices)
        .multi_cartesian_product()
        .filter_map(|assignment| {
            let literals: Vec<Literal> = assignment
                .iter()
                .enumerate()
                .map(|(i, &j)| literal_for(i, j))
                .collect();
            if literals.iter().all(|lit| feasible(lit, world)) {
                Some(Conjunction(literals))
            } else {
                None
            }
        })
        .collect()
}

fn binary_all(
    relation: Relation,
    targets: &[ObjectId],
    targets_all: bool,
    goals: &[ObjectId],
    goals_all: bool,
    world: &WorldState,
) -> Vec<Conjunction> {
    match (targets_all, goals_all) {
        // every target-goal pair at once, or nothing
        (true, true) => {
            if targets.is_empty() || goals.is_empty() {
                return Vec::new();
            }
            let literals: Vec<Literal> = iproduct!(targets, goals)
                .map(|(t, g)| Literal::positive(relation, vec![t.clone(), g.clone()]))
                .collect();
            if literals.iter().all(|lit| feasible(lit, world)) {
                vec![Conjunction(literals)]
            } else {
                Vec::new()
            }
        }
        (true, false) => assignment_conjunctions(world, targets.len(), goals.len(), |i, j| {
            Literal::positive(relation, vec![targets[i].clone(), goals[j].clone()])
        }),
        (false, true) => assignment_conjunctions(world, goals.len(), targets.len(), |i, j| {
            Literal::positive(relation, vec![targets[j].clone(), goals[i].clone()])
        }),
        (false, false) => unreachable!("dispatched to binary_any"),
    }
}

fn between_any(
    targets: &[ObjectId],
    goals: &[ObjectId],
    goals2: &[ObjectId],
    world: &WorldState,
) -> Vec<Conjunction> {
    iproduct!(targets, goals, goals2)
        .map(|(t, g, h)| {
            Literal::positive(Relation::Between, vec![t.clone(), g.clone(), h.clone()])
        })
        .filter(|lit| feasible(lit, world))
        .map(|lit| Conjunction(vec![lit]))
        .collect()
}

/// The seven `all`-bearing cases of the ternary relation, keyed by which
/// of (target, first reference, second reference) is universally
/// quantified. Two-`all` cases enumerate the universal side by pair
/// index; the remaining slot is assigned per pair.
fn between_all(
    mask: (bool, bool, bool),
    targets: &[ObjectId],
    goals: &[ObjectId],
    goals2: &[ObjectId],
    world: &WorldState,
) -> Vec<Conjunction> {
    let between = |t: &ObjectId, g: &ObjectId, h: &ObjectId| {
        Literal::positive(Relation::Between, vec![t.clone(), g.clone(), h.clone()])
    };
    match mask {
        (true, true, true) => {
            if targets.is_empty() || goals.is_empty() || goals2.is_empty() {
                return Vec::new();
            }
            let literals: Vec<Literal> = iproduct!(targets, goals, goals2)
                .map(|(t, g, h)| between(t, g, h))
                .collect();
            if literals.iter().all(|lit| feasible(lit, world)) {
                vec![Conjunction(literals)]
            } else {
                Vec::new()
            }
        }
        (true, false, false) => {
            let pairs: Vec<(&ObjectId, &ObjectId)> =
                iproduct!(goals, goals2).collect();
            assignment_conjunctions(world, targets.len(), pairs.len(), |i, j| {
                between(&targets[i], pairs[j].0, pairs[j].1)
            })
        }
        (false, true, false) => {
            let pairs: Vec<(&ObjectId, &ObjectId)> =
                iproduct!(targets, goals2).collect();
            assignment_conjunctions(world, goals.len(), pairs.len(), |i, j| {
                between(pairs[j].0, &goals[i], pairs[j].1)
            })
        }
        (false, false, true) => {
            let pairs: Vec<(&ObjectId, &ObjectId)> =
                iproduct!(targets, goals).collect();
            assignment_conjunctions(world, goals2.len(), pairs.len(), |i, j| {
                between(pairs[j].0, pairs[j].1, &goals2[i])
            })
        }
        (true, true, false) => {
            let pairs: Vec<(&ObjectId, &ObjectId)> =
                iproduct!(targets, goals).collect();
            assignment_conjunctions(world, pairs.len(), goals2.len(), |i, j| {
                between(pairs[i].0, pairs[i].1, &goals2[j])
            })
        }
        (true, false, true) => {
            let pairs: Vec<(&ObjectId, &ObjectId)> =
                iproduct!(targets, goals2).collect();
            assignment_conjunctions(world, pairs.len(), goals.len(), |i, j| {
                between(pairs[i].0, &goals[j], pairs[i].1)
            })
        }
        (false, true, true) => {
            let pairs: Vec<(&ObjectId, &ObjectId)> =
                iproduct!(goals, goals2).collect();
            assignment_conjunctions(world, pairs.len(), targets.len(), |i, j| {
                between(&targets[j], pairs[i].0, pairs[i].1)
            })
        }
        (false, false, false) => unreachable!("dispatched to between_any"),
    }
}

/// A target other than the floor supports exactly one direct child, so a
/// conjunction that stacks two distinct objects onto the same target can
/// never be satisfied.
fn supports_single_child(conjunction: &Conjunction) -> bool {
    let mut direct: HashMap<&ObjectId, &ObjectId> = HashMap::new();
    for literal in &conjunction.0 {
        if matches!(literal.relation, Relation::OnTop | Relation::Inside) {
            let (child, target) = (&literal.args[0], &literal.args[1]);
            if target.is_floor() {
                continue;
            }
            if let Some(previous) = direct.insert(target, child) {
                if previous != child {
                    return false;
                }
            }
        }
    }
    true
}

/// `the` promises a unique referent. When the formula leaves several,
/// ask the user which one was meant, or report that our descriptions
/// cannot tell the candidates apart.
fn check_clarification(
    command: &Command,
    dnf: &Dnf,
    world: &WorldState,
) -> Result<(), InterpretError> {
    let (entity_quantifier, location) = match command {
        Command::Take { entity } => (Some(entity.quantifier), None),
        Command::Put { location } => (None, Some(location)),
        Command::Move { entity, location } => (Some(entity.quantifier), Some(location)),
    };
    let between = location.map_or(false, |l| l.relation == Relation::Between);
    // the two argument orders of a symmetric `between` pair are not an
    // ambiguity
    let threshold = if between { 2 } else { 1 };
    if dnf.0.len() <= threshold {
        return Ok(());
    }
    let strides: &[(usize, usize)] = if between { &[(0, 2), (1, 2)] } else { &[(0, 1)] };

    let mut checks: Vec<(usize, Quantifier)> = Vec::new();
    if let Some(q) = entity_quantifier {
        checks.push((0, q));
    }
    if let Some(l) = location {
        checks.push((1, l.entity.quantifier));
        if let Some(e2) = &l.entity2 {
            checks.push((2, e2.quantifier));
        }
    }

    for (column, quantifier) in checks {
        if quantifier != Quantifier::The {
            continue;
        }
        for &(start, step) in strides {
            let mut ids: Vec<&ObjectId> = Vec::new();
            let mut descriptions: Vec<String> = Vec::new();
            for conjunction in dnf.0.iter().skip(start).step_by(step) {
                let literal = match conjunction.0.first() {
                    Some(l) => l,
                    None => continue,
                };
                let id = match literal.args.get(column) {
                    Some(id) => id,
                    None => continue,
                };
                if ids.contains(&id) {
                    continue;
                }
                let description = format!("the {}", physics::full_description(id, world));
                if descriptions.contains(&description) {
                    return Err(InterpretError::DescriptionAmbiguous(description));
                }
                ids.push(id);
                descriptions.push(description);
            }
            if ids.len() > 1 {
                return Err(InterpretError::Clarify(descriptions));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse;
    use crate::world::examples::SMALL;
    use crate::world::WorldState;

    fn parse_one(input: &str) -> Command {
        let mut parses = parse(input).unwrap();
        assert_eq!(parses.len(), 1);
        parses.pop().unwrap()
    }

    fn formula(input: &str, world: &WorldState) -> Result<Dnf, InterpretError> {
        interpret(&parse_one(input), world)
    }

    #[test]
    fn resolver_is_sound_for_leaves() {
        let command = parse_one("take a ball");
        let entity = match &command {
            Command::Take { entity } => entity,
            _ => unreachable!(),
        };
        let candidates = resolve_entity(entity, &SMALL);
        assert_eq!(candidates.main, vec!["e".into(), "f".into()]);
        for id in &candidates.main {
            let description = SMALL.description(id).unwrap();
            assert!(physics::matches_description(
                entity.object.descriptor(),
                &description
            ));
        }
    }

    #[test]
    fn anyform_resolves_to_real_objects_only() {
        let command = parse_one("take an object");
        let entity = match &command {
            Command::Take { entity } => entity,
            _ => unreachable!(),
        };
        let candidates = resolve_entity(entity, &SMALL);
        assert!(!candidates.main.iter().any(|id| id.is_floor()));
        assert_eq!(candidates.main.len(), 6);
    }

    #[test]
    fn resolver_honors_nested_constraints() {
        // only `f` sits inside a box (`m`); `e` is on the floor
        let command = parse_one("take a ball in a box");
        let entity = match &command {
            Command::Take { entity } => entity,
            _ => unreachable!(),
        };
        let candidates = resolve_entity(entity, &SMALL);
        assert_eq!(candidates.main, vec!["f".into()]);
        assert_eq!(candidates.relation, Some(Relation::Inside));
    }

    #[test]
    fn take_the_white_ball() {
        assert_eq!(
            formula("take the white ball", &SMALL),
            Ok("holding(e)".parse().unwrap())
        );
    }

    #[test]
    fn take_the_ball_is_ambiguous() {
        assert_eq!(
            formula("take the ball", &SMALL),
            Err(InterpretError::Clarify(vec![
                "the large white ball".to_owned(),
                "the small black ball".to_owned(),
            ]))
        );
    }

    #[test]
    fn the_floor_cannot_be_moved() {
        assert_eq!(
            formula("move the floor left of the ball", &SMALL),
            Err(InterpretError::NoValidInterpretation)
        );
    }

    #[test]
    fn take_all_needs_a_unique_candidate() {
        assert_eq!(
            formula("take all balls", &SMALL),
            Err(InterpretError::OneObjectAtATime)
        );
        assert_eq!(
            formula("take all tables", &SMALL),
            Ok("holding(g)".parse().unwrap())
        );
    }

    #[test]
    fn put_uses_the_held_object() {
        let mut world = SMALL.clone();
        world.stacks[0].pop();
        world.holding = Some("e".into());
        assert_eq!(
            formula("put it on the floor", &world),
            Ok("ontop(e, floor)".parse().unwrap())
        );
        // nothing held: nothing to put
        assert_eq!(
            formula("put it on the floor", &SMALL),
            Err(InterpretError::NoValidInterpretation)
        );
    }

    #[test]
    fn between_crosses_both_references() {
        let mut world = SMALL.clone();
        world.stacks[0].pop();
        world.holding = Some("e".into());
        // boxes k and l can flank the ball in either order
        let dnf = formula("put the white ball between a box and a box", &world).unwrap();
        let expected: Dnf = "between(e, k, l) | between(e, k, m) | between(e, l, k) \
                             | between(e, l, m) | between(e, m, k) | between(e, m, l)"
            .parse()
            .unwrap();
        assert_eq!(dnf, expected);
    }

    #[test]
    fn move_all_balls_into_large_boxes() {
        let dnf = formula("move all balls inside a large box", &SMALL).unwrap();
        // one box per ball: the shared-box assignments are filtered out
        let expected: Dnf = "inside(e, k) & inside(f, l) | inside(e, l) & inside(f, k)"
            .parse()
            .unwrap();
        assert_eq!(dnf, expected);
    }

    #[test]
    fn all_on_the_goal_side() {
        // every large box must end up on the large table
        let dnf = formula("move a table under all large boxes", &SMALL);
        // g is the only existing table; k and l the large boxes
        assert_eq!(
            dnf,
            Ok("under(g, k) & under(g, l)".parse().unwrap())
        );
    }

    #[test]
    fn infeasible_goals_empty_the_formula() {
        // balls cannot rest on tables
        assert_eq!(
            formula("move the white ball on the table", &SMALL),
            Err(InterpretError::NoValidInterpretation)
        );
    }

    #[test]
    fn indistinguishable_objects_raise_description_ambiguity() {
        let mut world = SMALL.clone();
        // a second large white ball, indistinguishable from `e`
        world.objects.insert(
            "e2".into(),
            world.objects[&ObjectId::from("e")].clone(),
        );
        world.stacks[2].push("e2".into());
        match formula("take the white ball", &world) {
            Err(InterpretError::DescriptionAmbiguous(d)) => {
                assert_eq!(d, "the large white ball")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn an_empty_world_interprets_nothing() {
        let world: WorldState = serde_json::from_str(
            r#"{ "stacks": [], "holding": null, "arm": 0, "objects": {} }"#,
        )
        .unwrap();
        assert_eq!(
            formula("take a ball", &world),
            Err(InterpretError::NoValidInterpretation)
        );
    }

    #[test]
    fn clarification_messages_render_as_questions() {
        let error = InterpretError::Clarify(vec![
            "the large white ball".to_owned(),
            "the small black ball".to_owned(),
        ]);
        assert_eq!(
            error.to_string(),
            "An ambiguity exists, did you mean: - the large white ball? - the small black ball?"
        );
    }
}
