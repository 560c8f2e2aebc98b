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

//! Pretty-printable trees for parses and interpretations, for the
//! `--explain` output.

use ptree::item::StringItem;
use ptree::TreeBuilder;

use crate::grammar::{Command, Entity, Location, Object};
use crate::logic::Dnf;

/// The structure of one parse, as a printable tree.
pub fn parse_tree(command: &Command) -> StringItem {
    let mut builder = TreeBuilder::new(command.to_string());
    match command {
        Command::Take { entity } => {
            add_entity(&mut builder, entity);
        }
        Command::Put { location } => {
            add_location(&mut builder, location);
        }
        Command::Move { entity, location } => {
            add_entity(&mut builder, entity);
            add_location(&mut builder, location);
        }
    }
    builder.build()
}

/// A parse together with the goal formula it interprets to.
pub fn interpretation_tree(command: &Command, formula: &Dnf) -> StringItem {
    let mut builder = TreeBuilder::new(command.to_string());
    builder.begin_child("goal".to_owned());
    for conjunction in &formula.0 {
        builder.add_empty_child(conjunction.to_string());
    }
    builder.end_child();
    builder.build()
}

fn add_entity(builder: &mut TreeBuilder, entity: &Entity) {
    builder.begin_child(format!("entity: {}", entity.quantifier));
    add_object(builder, &entity.object);
    builder.end_child();
}

fn add_object(builder: &mut TreeBuilder, object: &Object) {
    match object {
        Object::Leaf(description) => {
            builder.add_empty_child(format!("object: {}", description));
        }
        Object::Nested { object, location } => {
            builder.begin_child("object".to_owned());
            add_object(builder, object);
            add_location(builder, location);
            builder.end_child();
        }
    }
}

fn add_location(builder: &mut TreeBuilder, location: &Location) {
    builder.begin_child(format!("location: {}", location.relation));
    add_entity(builder, &location.entity);
    if let Some(entity2) = &location.entity2 {
        add_entity(builder, entity2);
    }
    builder.end_child();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse;

    fn render(item: &StringItem) -> String {
        let mut out = Vec::new();
        ptree::write_tree(item, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parse_trees_show_the_nesting() {
        let command = parse("take the ball in a box").unwrap().pop().unwrap();
        let rendered = render(&parse_tree(&command));
        assert!(rendered.contains("entity: the"));
        assert!(rendered.contains("location: inside"));
        assert!(rendered.contains("object: ball"));
        assert!(rendered.contains("object: box"));
    }

    #[test]
    fn interpretation_trees_list_the_disjuncts() {
        let command = parse("take the ball in a box").unwrap().pop().unwrap();
        let formula: Dnf = "holding(f)".parse().unwrap();
        let rendered = render(&interpretation_tree(&command, &formula));
        assert!(rendered.contains("goal"));
        assert!(rendered.contains("holding(f)"));
    }
}
