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

//! The physical laws of the blocks world, as pure predicates.
//!
//! Everything here is a function of its arguments only: whether an
//! arrangement currently satisfies a spatial relation, whether one object
//! may rest on another, whether a rearrangement goal is achievable in
//! principle, and how to describe an object to the user.

use crate::logic::Relation;
use crate::world::{Form, FoundObject, ObjectDescription, ObjectId, Size, WorldState};

/// May `top` rest directly on `bottom`?
///
/// The law table:
/// 1. everything may rest on the floor;
/// 2. balls may only rest on boxes or the floor;
/// 3. balls support nothing;
/// 4. small objects never support large objects;
/// 5. a box cannot contain a plank, pyramid or box of its own size;
/// 6. small boxes cannot rest on small objects or on pyramids;
/// 7. large boxes cannot rest on large pyramids;
/// 8. the floor is never a top object.
pub fn is_stacking_allowed(top: &ObjectDescription, bottom: &ObjectDescription) -> bool {
    if top.form == Form::Floor {
        return false;
    }
    if bottom.form == Form::Floor {
        return true;
    }
    if bottom.form == Form::Ball {
        return false;
    }
    if bottom.size == Some(Size::Small) && top.size == Some(Size::Large) {
        return false;
    }
    if top.form == Form::Ball {
        return bottom.form == Form::Box;
    }
    if bottom.form == Form::Box
        && matches!(top.form, Form::Plank | Form::Pyramid | Form::Box)
        && top.size == bottom.size
    {
        return false;
    }
    if top.form == Form::Box {
        match top.size {
            Some(Size::Small) => {
                if bottom.form == Form::Pyramid || bottom.size == Some(Size::Small) {
                    return false;
                }
            }
            _ => {
                if bottom.form == Form::Pyramid {
                    return false;
                }
            }
        }
    }
    true
}

/// Does the *current* arrangement of `a` (and `b`, and `c` for the
/// ternary `between`) satisfy `relation`?
pub fn has_valid_location(
    a: &FoundObject,
    relation: Relation,
    b: Option<&FoundObject>,
    c: Option<&FoundObject>,
) -> bool {
    if relation == Relation::Holding {
        return a.is_held();
    }
    // A held object has no column; no spatial relation can hold of it.
    if a.is_held() || b.map_or(false, |o| o.is_held()) || c.map_or(false, |o| o.is_held()) {
        return false;
    }
    if a.is_floor() {
        return false;
    }
    let b = match b {
        Some(b) => b,
        None => return false,
    };
    match relation {
        Relation::LeftOf => match (a.stack(), b.stack()) {
            (Some(sa), Some(sb)) => sa < sb,
            _ => false,
        },
        Relation::RightOf => match (a.stack(), b.stack()) {
            (Some(sa), Some(sb)) => sa > sb,
            _ => false,
        },
        Relation::Beside => match (a.stack(), b.stack()) {
            (Some(sa), Some(sb)) => sa + 1 == sb || sb + 1 == sa,
            _ => false,
        },
        Relation::Between => {
            let c = match c {
                Some(c) => c,
                None => return false,
            };
            match (a.stack(), b.stack(), c.stack()) {
                (Some(sa), Some(sb), Some(sc)) => {
                    (sb < sa && sa < sc) || (sc < sa && sa < sb)
                }
                _ => false,
            }
        }
        Relation::Inside => {
            b.description.form == Form::Box
                && same_stack(a, b)
                && directly_above(a, b)
                && !(b.description.size == Some(Size::Small)
                    && a.description.size == Some(Size::Large))
        }
        Relation::OnTop => {
            if b.is_floor() {
                a.height() == Some(0)
            } else {
                same_stack(a, b)
                    && directly_above(a, b)
                    && is_stacking_allowed(&a.description, &b.description)
            }
        }
        Relation::Under => same_stack(a, b) && a.height() < b.height(),
        Relation::Above => {
            if b.is_floor() {
                a.stack().is_some()
            } else {
                same_stack(a, b) && a.height() > b.height()
            }
        }
        Relation::Holding => unreachable!("handled above"),
    }
}

fn same_stack(a: &FoundObject, b: &FoundObject) -> bool {
    match (a.stack(), b.stack()) {
        (Some(sa), Some(sb)) => sa == sb,
        _ => false,
    }
}

fn directly_above(a: &FoundObject, b: &FoundObject) -> bool {
    match (a.height(), b.height()) {
        (Some(ha), Some(hb)) => ha == hb + 1,
        _ => false,
    }
}

/// Is the rearrangement goal `relation(a, b[, c])` achievable in
/// principle, regardless of the current arrangement?
pub fn is_valid_goal_location(
    world: &WorldState,
    a: &ObjectId,
    relation: Relation,
    b: Option<&ObjectId>,
    c: Option<&ObjectId>,
) -> bool {
    // The same object cannot stand in a spatial relation to itself.
    if Some(a) == b || Some(a) == c || (b.is_some() && b == c) {
        return false;
    }
    // The floor cannot be repositioned.
    if a.is_floor() {
        return false;
    }
    let da = match world.description(a) {
        Some(d) => d,
        None => return false,
    };
    if relation == Relation::Holding {
        return b.is_none();
    }
    let b = match b {
        Some(b) => b,
        None => return false,
    };
    let db = match world.description(b) {
        Some(d) => d,
        None => return false,
    };
    match relation {
        Relation::LeftOf | Relation::RightOf | Relation::Beside => !b.is_floor(),
        Relation::Between => match c.and_then(|c| world.description(c).map(|dc| (c, dc))) {
            Some((c, _)) => !b.is_floor() && !c.is_floor(),
            None => false,
        },
        Relation::OnTop => b.is_floor() || is_stacking_allowed(&da, &db),
        Relation::Inside => {
            db.form == Form::Box
                && !(db.size == Some(Size::Small) && da.size == Some(Size::Large))
        }
        // `b` must eventually sit above `a`: impossible above a ball, and
        // nothing is under the floor.
        Relation::Under => !b.is_floor() && da.form != Form::Ball,
        Relation::Above => b.is_floor() || db.form != Form::Ball,
        Relation::Holding => unreachable!("handled above"),
    }
}

/// Does a parsed leaf descriptor match a concrete object description?
/// `anyform` matches every real form, never the floor sentinel.
pub fn matches_description(descriptor: &ObjectDescription, actual: &ObjectDescription) -> bool {
    let form_matches = if descriptor.form == Form::Anyform {
        actual.form != Form::Floor
    } else {
        descriptor.form == actual.form
    };
    form_matches
        && descriptor.size.map_or(true, |s| actual.size == Some(s))
        && descriptor.color.map_or(true, |c| actual.color == Some(c))
}

/// The shortest of `form`, `color form`, `size color form` that uniquely
/// names `id` among the existing objects. Falls back to the full
/// description when even that is not unique; deciding whether a collision
/// is an error is the caller's business.
pub fn minimal_description(id: &ObjectId, world: &WorldState) -> String {
    let description = match world.description(id) {
        Some(d) => d,
        None => return id.to_string(),
    };
    let attempts = [
        ObjectDescription::of_form(description.form),
        ObjectDescription {
            form: description.form,
            size: None,
            color: description.color,
        },
        description.clone(),
    ];
    for attempt in &attempts {
        let matching = world
            .existing_ids()
            .iter()
            .filter(|other| {
                world
                    .description(other)
                    .map_or(false, |d| matches_description(attempt, &d))
            })
            .count();
        if matching == 1 {
            return attempt.to_string();
        }
    }
    description.to_string()
}

/// The full `size color form` description, used by clarification
/// questions.
pub fn full_description(id: &ObjectId, world: &WorldState) -> String {
    world
        .description(id)
        .map_or_else(|| id.to_string(), |d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Color, Placement};

    fn desc(form: Form, size: Size, color: Color) -> ObjectDescription {
        ObjectDescription {
            form,
            size: Some(size),
            color: Some(color),
        }
    }

    fn stacked(description: ObjectDescription, stack: usize, height: usize) -> FoundObject {
        FoundObject {
            description,
            placement: Placement::Stacked { stack, height },
        }
    }

    #[test]
    fn stacking_laws() {
        let floor = ObjectDescription::floor();
        let large_ball = desc(Form::Ball, Size::Large, Color::White);
        let small_ball = desc(Form::Ball, Size::Small, Color::Black);
        let large_box = desc(Form::Box, Size::Large, Color::Yellow);
        let small_box = desc(Form::Box, Size::Small, Color::Blue);
        let large_brick = desc(Form::Brick, Size::Large, Color::Green);
        let small_brick = desc(Form::Brick, Size::Small, Color::White);
        let large_pyramid = desc(Form::Pyramid, Size::Large, Color::Yellow);
        let small_pyramid = desc(Form::Pyramid, Size::Small, Color::Red);
        let large_plank = desc(Form::Plank, Size::Large, Color::Red);
        let large_table = desc(Form::Table, Size::Large, Color::Blue);

        // everything rests on the floor, the floor rests on nothing
        assert!(is_stacking_allowed(&large_ball, &floor));
        assert!(is_stacking_allowed(&large_box, &floor));
        assert!(!is_stacking_allowed(&floor, &large_box));

        // balls go in boxes or on the floor, and support nothing
        assert!(is_stacking_allowed(&large_ball, &large_box));
        assert!(!is_stacking_allowed(&large_ball, &large_brick));
        assert!(!is_stacking_allowed(&small_brick, &small_ball));

        // small never supports large
        assert!(!is_stacking_allowed(&large_brick, &small_brick));
        assert!(!is_stacking_allowed(&large_ball, &small_box));

        // boxes cannot contain planks, pyramids or boxes of their own size
        assert!(!is_stacking_allowed(&large_plank, &large_box));
        assert!(!is_stacking_allowed(&large_pyramid, &large_box));
        assert!(!is_stacking_allowed(&small_box, &small_box));
        assert!(is_stacking_allowed(&small_box, &large_box));
        assert!(is_stacking_allowed(&large_table, &large_box));

        // box-on-support restrictions
        assert!(!is_stacking_allowed(&small_box, &small_brick));
        assert!(!is_stacking_allowed(&small_box, &small_pyramid));
        assert!(!is_stacking_allowed(&small_box, &large_pyramid));
        assert!(!is_stacking_allowed(&large_box, &large_pyramid));
        assert!(is_stacking_allowed(&small_box, &large_brick));
        assert!(is_stacking_allowed(&large_box, &large_table));
    }

    #[test]
    fn location_predicates() {
        let a = stacked(desc(Form::Ball, Size::Large, Color::White), 1, 0);
        let b = stacked(desc(Form::Brick, Size::Large, Color::Green), 3, 0);
        let c = stacked(desc(Form::Table, Size::Large, Color::Blue), 0, 0);

        assert!(has_valid_location(&a, Relation::LeftOf, Some(&b), None));
        assert!(!has_valid_location(&b, Relation::LeftOf, Some(&a), None));
        assert!(has_valid_location(&b, Relation::RightOf, Some(&a), None));
        assert!(has_valid_location(&a, Relation::Beside, Some(&c), None));
        assert!(!has_valid_location(&a, Relation::Beside, Some(&b), None));
        assert!(has_valid_location(&a, Relation::Between, Some(&c), Some(&b)));
        assert!(has_valid_location(&a, Relation::Between, Some(&b), Some(&c)));
        assert!(!has_valid_location(&c, Relation::Between, Some(&a), Some(&b)));
    }

    #[test]
    fn vertical_predicates() {
        let box_k = stacked(desc(Form::Box, Size::Large, Color::Yellow), 2, 0);
        let ball = stacked(desc(Form::Ball, Size::Small, Color::Black), 2, 1);
        let floor = FoundObject {
            description: ObjectDescription::floor(),
            placement: Placement::Floor,
        };

        assert!(has_valid_location(&ball, Relation::Inside, Some(&box_k), None));
        assert!(!has_valid_location(&box_k, Relation::Inside, Some(&ball), None));
        assert!(has_valid_location(&ball, Relation::Above, Some(&box_k), None));
        assert!(has_valid_location(&box_k, Relation::Under, Some(&ball), None));
        assert!(has_valid_location(&box_k, Relation::OnTop, Some(&floor), None));
        assert!(!has_valid_location(&ball, Relation::OnTop, Some(&floor), None));
        assert!(has_valid_location(&ball, Relation::Above, Some(&floor), None));
    }

    #[test]
    fn held_objects_satisfy_only_holding() {
        let held = FoundObject {
            description: desc(Form::Ball, Size::Large, Color::White),
            placement: Placement::Held,
        };
        let other = stacked(desc(Form::Box, Size::Large, Color::Yellow), 0, 0);
        assert!(has_valid_location(&held, Relation::Holding, None, None));
        assert!(!has_valid_location(&held, Relation::Inside, Some(&other), None));
        assert!(!has_valid_location(&other, Relation::Beside, Some(&held), None));
    }

    #[test]
    fn descriptor_matching() {
        let white_ball = desc(Form::Ball, Size::Large, Color::White);
        let any = ObjectDescription::of_form(Form::Anyform);
        let a_ball = ObjectDescription::of_form(Form::Ball);
        let black_ball = ObjectDescription {
            form: Form::Ball,
            size: None,
            color: Some(Color::Black),
        };
        assert!(matches_description(&any, &white_ball));
        assert!(matches_description(&a_ball, &white_ball));
        assert!(!matches_description(&black_ball, &white_ball));
        // "object" never denotes the floor, but "the floor" does
        assert!(!matches_description(&any, &ObjectDescription::floor()));
        assert!(matches_description(
            &ObjectDescription::of_form(Form::Floor),
            &ObjectDescription::floor()
        ));
    }

    #[test]
    fn minimal_descriptions_in_the_small_world() {
        let world = &*crate::world::examples::SMALL;
        // `e` is the only white object among the existing ones
        assert_eq!(minimal_description(&"e".into(), world), "white ball");
        // `g` is the only table on a stack
        assert_eq!(minimal_description(&"g".into(), world), "table");
        // two large boxes exist (`k` yellow, `l` red), so color is needed
        assert_eq!(minimal_description(&"k".into(), world), "yellow box");
        assert_eq!(full_description(&"k".into(), world), "large yellow box");
    }
}
