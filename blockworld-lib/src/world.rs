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

//! The world data model: object attributes, stacks, the gripper arm, and
//! the `FoundObject` projection the physics predicates operate on.
//!
//! A world is a row of stacks resting on the floor. Only identifiers that
//! appear in a stack or in the gripper exist for reference resolution;
//! `objects` may describe extras that are simply absent.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::physics;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Form {
    Brick,
    Plank,
    Ball,
    Box,
    Pyramid,
    Table,
    /// Matches every real form in description matching ("object", "thing").
    Anyform,
    /// Sentinel form of the floor pseudo-object.
    Floor,
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Form::Brick => "brick",
            Form::Plank => "plank",
            Form::Ball => "ball",
            Form::Box => "box",
            Form::Pyramid => "pyramid",
            Form::Table => "table",
            Form::Anyform => "object",
            Form::Floor => "floor",
        };
        write!(f, "{}", word)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    Large,
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Size::Small => write!(f, "small"),
            Size::Large => write!(f, "large"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
    Red,
    Green,
    Blue,
    Yellow,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Color::Black => "black",
            Color::White => "white",
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
        };
        write!(f, "{}", word)
    }
}

/// Attributes of an object. The same shape serves as a concrete world
/// object (size and color normally present) and as a leaf descriptor in a
/// parsed noun phrase (either may be absent).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub form: Form,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl ObjectDescription {
    pub fn of_form(form: Form) -> Self {
        ObjectDescription {
            form,
            size: None,
            color: None,
        }
    }

    pub fn floor() -> Self {
        ObjectDescription::of_form(Form::Floor)
    }
}

impl fmt::Display for ObjectDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(size) = self.size {
            write!(f, "{} ", size)?;
        }
        if let Some(color) = self.color {
            write!(f, "{} ", color)?;
        }
        write!(f, "{}", self.form)
    }
}

/// A world object key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

pub const FLOOR: &str = "floor";

impl ObjectId {
    pub fn floor() -> Self {
        ObjectId(FLOOR.to_owned())
    }

    pub fn is_floor(&self) -> bool {
        self.0 == FLOOR
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId(s.to_owned())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an object currently sits. Exactly one of the three cases holds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Placement {
    Floor,
    Held,
    /// `stack` is the column index, `height` the bottom-indexed position.
    Stacked { stack: usize, height: usize },
}

/// Projection of one object out of a world (or a search node): its
/// attributes plus its placement.
#[derive(Clone, PartialEq, Debug)]
pub struct FoundObject {
    pub description: ObjectDescription,
    pub placement: Placement,
}

impl FoundObject {
    pub fn is_floor(&self) -> bool {
        self.placement == Placement::Floor
    }

    pub fn is_held(&self) -> bool {
        self.placement == Placement::Held
    }

    pub fn stack(&self) -> Option<usize> {
        match self.placement {
            Placement::Stacked { stack, .. } => Some(stack),
            _ => None,
        }
    }

    pub fn height(&self) -> Option<usize> {
        match self.placement {
            Placement::Stacked { height, .. } => Some(height),
            _ => None,
        }
    }
}

/// The full world: a row of stacks, the gripper, and the object table.
/// Read-only to the interpretation and planning pipeline.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct WorldState {
    /// Each stack is ordered bottom to top.
    pub stacks: Vec<Vec<ObjectId>>,
    #[serde(default)]
    pub holding: Option<ObjectId>,
    /// Column the gripper currently hovers over.
    #[serde(default)]
    pub arm: usize,
    pub objects: BTreeMap<ObjectId, ObjectDescription>,
    /// Sample utterances, for interactive front ends.
    #[serde(default)]
    pub examples: Vec<String>,
}

impl WorldState {
    /// Identifiers that exist for reference resolution: everything on a
    /// stack or in the gripper, plus the floor sentinel. Iteration order
    /// is the lexicographic order of the object table, floor last.
    pub fn existing_ids(&self) -> Vec<ObjectId> {
        let mut present: HashSet<&ObjectId> = self.stacks.iter().flatten().collect();
        if let Some(held) = &self.holding {
            present.insert(held);
        }
        let mut ids: Vec<ObjectId> = self
            .objects
            .keys()
            .filter(|id| present.contains(id))
            .cloned()
            .collect();
        ids.push(ObjectId::floor());
        ids
    }

    /// The attributes of `id`, with the floor handled as a pseudo-object.
    pub fn description(&self, id: &ObjectId) -> Option<ObjectDescription> {
        if id.is_floor() {
            Some(ObjectDescription::floor())
        } else {
            self.objects.get(id).cloned()
        }
    }

    /// Locate `id` in the world.
    pub fn find(&self, id: &ObjectId) -> Option<FoundObject> {
        let description = self.description(id)?;
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

    /// Check the structural and physical invariants of a world definition.
    pub fn validate(&self) -> Result<(), WorldError> {
        let mut seen = HashSet::new();
        for id in self.stacks.iter().flatten().chain(self.holding.iter()) {
            if id.is_floor() {
                return Err(WorldError::FloorInStack);
            }
            if !seen.insert(id) {
                return Err(WorldError::DuplicateObject(id.clone()));
            }
            if !self.objects.contains_key(id) {
                return Err(WorldError::UnknownObject(id.clone()));
            }
        }
        if !self.stacks.is_empty() && self.arm >= self.stacks.len() {
            return Err(WorldError::ArmOutOfRange {
                arm: self.arm,
                stacks: self.stacks.len(),
            });
        }
        for column in &self.stacks {
            for pair in column.windows(2) {
                let bottom = &self.objects[&pair[0]];
                let top = &self.objects[&pair[1]];
                if !physics::is_stacking_allowed(top, bottom) {
                    return Err(WorldError::IllegalSupport {
                        top: pair[1].clone(),
                        bottom: pair[0].clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl str::FromStr for WorldState {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum WorldError {
    #[error("object \"{0}\" appears more than once")]
    DuplicateObject(ObjectId),
    #[error("object \"{0}\" has no description")]
    UnknownObject(ObjectId),
    #[error("arm column {arm} is outside the {stacks} stacks")]
    ArmOutOfRange { arm: usize, stacks: usize },
    #[error("\"{top}\" cannot rest on \"{bottom}\"")]
    IllegalSupport { top: ObjectId, bottom: ObjectId },
    #[error("the floor cannot appear in a stack")]
    FloorInStack,
}

/// Built-in example worlds, embedded so the binary works out of the box.
pub mod examples {
    use super::WorldState;
    use lazy_static::lazy_static;

    lazy_static! {
        pub static ref SMALL: WorldState =
            serde_json::from_str(include_str!("../worlds/small.json"))
                .expect("embedded small world is well-formed");
        pub static ref MEDIUM: WorldState =
            serde_json::from_str(include_str!("../worlds/medium.json"))
                .expect("embedded medium world is well-formed");
    }

    pub const NAMES: &[&str] = &["small", "medium"];

    pub fn builtin(name: &str) -> Option<&'static WorldState> {
        match name {
            "small" => Some(&SMALL),
            "medium" => Some(&MEDIUM),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_world() -> WorldState {
        serde_json::from_str(
            r#"{
                "stacks": [["a"], [], ["k", "e"]],
                "holding": null,
                "arm": 0,
                "objects": {
                    "a": { "form": "brick", "size": "large", "color": "green" },
                    "e": { "form": "ball", "size": "large", "color": "white" },
                    "k": { "form": "box", "size": "large", "color": "yellow" }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn existing_ids_are_ordered_and_end_with_floor() {
        let world = toy_world();
        let ids: Vec<String> = world.existing_ids().iter().map(|i| i.0.clone()).collect();
        assert_eq!(ids, vec!["a", "e", "k", "floor"]);
    }

    #[test]
    fn find_locates_stacked_held_and_floor() {
        let mut world = toy_world();
        assert_eq!(
            world.find(&"e".into()).unwrap().placement,
            Placement::Stacked { stack: 2, height: 1 }
        );
        assert_eq!(
            world.find(&ObjectId::floor()).unwrap().placement,
            Placement::Floor
        );
        let e = world.stacks[2].pop().unwrap();
        world.holding = Some(e);
        assert!(world.find(&"e".into()).unwrap().is_held());
        assert!(world.find(&"z".into()).is_none());
    }

    #[test]
    fn validate_accepts_the_toy_world() {
        assert_eq!(toy_world().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_duplicates_and_bad_support() {
        let mut world = toy_world();
        world.stacks[1].push("a".into());
        assert_eq!(
            world.validate(),
            Err(WorldError::DuplicateObject("a".into()))
        );

        let mut world = toy_world();
        // a ball may not rest on a brick
        world.stacks[0].push("e".into());
        world.stacks[2].pop();
        assert_eq!(
            world.validate(),
            Err(WorldError::IllegalSupport {
                top: "e".into(),
                bottom: "a".into()
            })
        );
    }

    #[test]
    fn builtin_worlds_are_valid() {
        for name in examples::NAMES {
            let world = examples::builtin(name).unwrap();
            assert_eq!(world.validate(), Ok(()), "world {}", name);
        }
    }

    #[test]
    fn world_round_trips_through_json() {
        let world = toy_world();
        let json = serde_json::to_string(&world).unwrap();
        assert_eq!(json.parse::<WorldState>().unwrap(), world);
    }
}
