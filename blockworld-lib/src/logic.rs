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

//! Goal formulas: spatial literals, conjunctions, and the DNF the
//! interpreter hands to the planner.

use std::fmt;
use std::str;

use crate::world::ObjectId;

/// A spatial relation symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Relation {
    LeftOf,
    RightOf,
    Beside,
    Above,
    Under,
    OnTop,
    Inside,
    Between,
    Holding,
}

impl Relation {
    pub fn name(self) -> &'static str {
        match self {
            Relation::LeftOf => "leftof",
            Relation::RightOf => "rightof",
            Relation::Beside => "beside",
            Relation::Above => "above",
            Relation::Under => "under",
            Relation::OnTop => "ontop",
            Relation::Inside => "inside",
            Relation::Between => "between",
            Relation::Holding => "holding",
        }
    }

    pub fn from_name(name: &str) -> Option<Relation> {
        let relation = match name {
            "leftof" => Relation::LeftOf,
            "rightof" => Relation::RightOf,
            "beside" => Relation::Beside,
            "above" => Relation::Above,
            "under" => Relation::Under,
            "ontop" => Relation::OnTop,
            "inside" => Relation::Inside,
            "between" => Relation::Between,
            "holding" => Relation::Holding,
            _ => return None,
        };
        Some(relation)
    }

    /// Number of object arguments the relation takes.
    pub fn arity(self) -> usize {
        match self {
            Relation::Holding => 1,
            Relation::Between => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An elementary spatial assertion over object identifiers.
///
/// Only positive literals are ever generated today; `polarity` is carried
/// so negative goals remain expressible.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Literal {
    pub polarity: bool,
    pub relation: Relation,
    pub args: Vec<ObjectId>,
}

impl Literal {
    pub fn positive(relation: Relation, args: Vec<ObjectId>) -> Literal {
        Literal {
            polarity: true,
            relation,
            args,
        }
    }
}

/// A conjunction of literals; all must hold at once.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Conjunction(pub Vec<Literal>);

/// A goal in disjunctive normal form. The empty DNF is unsatisfiable; a
/// DNF holding one empty conjunction is trivially true.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Dnf(pub Vec<Conjunction>);

impl Dnf {
    pub fn is_unsatisfiable(&self) -> bool {
        self.0.is_empty()
    }
}

fn display_sep<T: fmt::Display>(seq: &[T], sep: &str) -> String {
    seq.iter()
        .map(|t| t.to_string())
        .collect::<Vec<String>>()
        .join(sep)
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.polarity {
            write!(f, "!")?;
        }
        write!(f, "{}({})", self.relation, display_sep(&self.args, ", "))
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_sep(&self.0, " & "))
    }
}

impl fmt::Display for Dnf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_sep(&self.0, " | "))
    }
}

impl str::FromStr for Literal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parser::literal(s) {
            Ok((_, o)) => Ok(o),
            Err(e) => Err(format!("{}", e)),
        }
    }
}

impl str::FromStr for Conjunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parser::conjunction(s) {
            Ok((_, o)) => Ok(o),
            Err(e) => Err(format!("{}", e)),
        }
    }
}

impl str::FromStr for Dnf {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parser::dnf(s) {
            Ok((_, o)) => Ok(o),
            Err(e) => Err(format!("{}", e)),
        }
    }
}

/// The parser for goal formulas is only for convenience in writing tests.
pub mod parser {
    use super::*;

    use nom::{
        branch::alt,
        bytes::complete::tag,
        character::complete::{alphanumeric1, space0},
        combinator::{map, map_opt, opt, recognize},
        error::VerboseError,
        multi::{many0, separated_list1},
        sequence::{delimited, pair, preceded, terminated},
    };

    pub type IResult<'a, O> = nom::IResult<&'a str, O, VerboseError<&'a str>>;

    fn ws<'a, F: 'a, O>(inner: F) -> impl FnMut(&'a str) -> IResult<'a, O>
    where
        F: FnMut(&'a str) -> IResult<'a, O>,
    {
        delimited(space0, inner, space0)
    }

    fn identifier(i: &str) -> IResult<&str> {
        recognize(pair(alphanumeric1, many0(alt((alphanumeric1, tag("_"))))))(i)
    }

    fn object_id(i: &str) -> IResult<ObjectId> {
        map(identifier, |s: &str| ObjectId(s.to_owned()))(i)
    }

    pub fn literal(i: &str) -> IResult<Literal> {
        map_opt(
            pair(
                pair(opt(tag("!")), identifier),
                delimited(
                    terminated(tag("("), space0),
                    separated_list1(ws(tag(",")), object_id),
                    preceded(space0, tag(")")),
                ),
            ),
            |((negation, name), args)| {
                let relation = Relation::from_name(name)?;
                if args.len() != relation.arity() {
                    return None;
                }
                Some(Literal {
                    polarity: negation.is_none(),
                    relation,
                    args,
                })
            },
        )(i)
    }

    pub fn conjunction(i: &str) -> IResult<Conjunction> {
        map(separated_list1(ws(tag("&")), literal), Conjunction)(i)
    }

    pub fn dnf(i: &str) -> IResult<Dnf> {
        map(separated_list1(ws(tag("|")), conjunction), Dnf)(i)
    }
}
