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

//! The surface grammar: a lexer over located spans and an all-parses
//! recursive-descent parser from utterances to command trees.
//!
//! Natural language is structurally ambiguous ("put a ball in a box on
//! the floor" has two attachments), so every production returns *all*
//! parses; the engine decides later whether the readings agree.

use std::fmt;

use itertools::Itertools;
use nom::bytes::complete::take_while1;
use nom::character::complete::multispace0;
use nom::error::VerboseError;
use nom::sequence::preceded;
use nom_locate::LocatedSpan;
use thiserror::Error;

use crate::logic::Relation;
use crate::world::{Color, Form, ObjectDescription, Size};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Quantifier {
    The,
    Any,
    All,
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::The => write!(f, "the"),
            Quantifier::Any => write!(f, "any"),
            Quantifier::All => write!(f, "all"),
        }
    }
}

/// A quantified noun phrase.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Entity {
    pub quantifier: Quantifier,
    pub object: Object,
}

/// A noun phrase body: either a bare descriptor or a descriptor
/// constrained by a relative clause. Nesting is tree-shaped, so plain
/// owned recursion suffices.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Object {
    Leaf(ObjectDescription),
    Nested {
        object: Box<Object>,
        location: Location,
    },
}

impl Object {
    /// The descriptor at the head of the phrase, however deep the
    /// relative clauses go.
    pub fn descriptor(&self) -> &ObjectDescription {
        match self {
            Object::Leaf(d) => d,
            Object::Nested { object, .. } => object.descriptor(),
        }
    }
}

/// A spatial constraint; `entity2` is present iff `relation` is
/// `between`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Location {
    pub relation: Relation,
    pub entity: Box<Entity>,
    pub entity2: Option<Box<Entity>>,
}

/// A parsed utterance.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Command {
    Take { entity: Entity },
    Put { location: Location },
    Move { entity: Entity, location: Location },
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantifier, self.object)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Leaf(d) => write!(f, "{}", d),
            // bracketed so the reading is unambiguous when echoed back
            Object::Nested { object, location } => {
                write!(f, "({} that is {})", object, location)
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.relation, &self.entity2) {
            (Relation::Between, Some(entity2)) => {
                write!(f, "between {} and {}", self.entity, entity2)
            }
            _ => {
                let phrase = match self.relation {
                    Relation::LeftOf => "left of",
                    Relation::RightOf => "right of",
                    Relation::Beside => "beside",
                    Relation::Above => "above",
                    Relation::Under => "under",
                    Relation::OnTop => "on top of",
                    Relation::Inside => "inside",
                    Relation::Between => "between",
                    Relation::Holding => "holding",
                };
                write!(f, "{} {}", phrase, self.entity)
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Take { entity } => write!(f, "take {}", entity),
            Command::Put { location } => write!(f, "put it {}", location),
            Command::Move { entity, location } => write!(f, "move {} {}", entity, location),
        }
    }
}

/// A failure to lex or parse an utterance. The span, when present, is a
/// byte range into the utterance for diagnostic labels.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<(usize, usize)>,
}

/// A lexed word with its position in the utterance.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub word: String,
    pub offset: usize,
    pub len: usize,
}

type Span<'a> = LocatedSpan<&'a str>;

fn word(i: Span) -> nom::IResult<Span, Span, VerboseError<Span>> {
    preceded(multispace0, take_while1(|c: char| c.is_ascii_alphabetic()))(i)
}

/// Split an utterance into lowercase word tokens. Anything that is not a
/// letter or whitespace is a lex error.
pub fn lex(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = Span::new(input);
    while let Ok((next, w)) = word(rest) {
        tokens.push(Token {
            word: w.fragment().to_ascii_lowercase(),
            offset: w.location_offset(),
            len: w.fragment().len(),
        });
        rest = next;
    }
    let tail = rest.fragment().trim_start();
    if let Some(c) = tail.chars().next() {
        let offset = rest.location_offset() + (rest.fragment().len() - tail.len());
        return Err(ParseError {
            message: format!("unexpected character {:?}", c),
            span: Some((offset, c.len_utf8())),
        });
    }
    Ok(tokens)
}

/// Parse an utterance into every command tree that consumes it entirely.
pub fn parse(input: &str) -> Result<Vec<Command>, ParseError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(ParseError {
            message: "empty utterance".to_owned(),
            span: None,
        });
    }
    let parses: Vec<Command> = command(&tokens)
        .into_iter()
        .filter(|(_, rest)| rest.is_empty())
        .map(|(c, _)| c)
        .unique()
        .collect();
    if parses.is_empty() {
        return Err(ParseError {
            message: "the utterance does not match the grammar".to_owned(),
            span: Some((0, input.len())),
        });
    }
    Ok(parses)
}

type Toks<'a> = &'a [Token];

fn eat<'a>(t: Toks<'a>, expected: &str) -> Option<Toks<'a>> {
    match t.split_first() {
        Some((first, rest)) if first.word == expected => Some(rest),
        _ => None,
    }
}

fn eat_seq<'a>(t: Toks<'a>, expected: &[&str]) -> Option<Toks<'a>> {
    expected.iter().try_fold(t, |rest, w| eat(rest, w))
}

fn command(t: Toks) -> Vec<(Command, Toks)> {
    let mut out = Vec::new();

    let takes = [eat(t, "take"), eat(t, "grasp"), eat_seq(t, &["pick", "up"])];
    for rest in takes.iter().flatten() {
        for (entity, rest) in entity(rest) {
            out.push((Command::Take { entity }, rest));
        }
    }

    let moves = [eat(t, "move"), eat(t, "put"), eat(t, "drop")];
    for rest in moves.iter().flatten() {
        if let Some(rest) = eat(rest, "it") {
            for (location, rest) in location(rest) {
                out.push((Command::Put { location }, rest));
            }
        }
        for (entity, rest) in entity(rest) {
            for (location, rest) in location(rest) {
                out.push((
                    Command::Move {
                        entity: entity.clone(),
                        location,
                    },
                    rest,
                ));
            }
        }
    }

    out
}

fn entity(t: Toks) -> Vec<(Entity, Toks)> {
    let (quantifier, rest) = match quantifier(t) {
        Some(q) => q,
        None => return Vec::new(),
    };
    object(rest)
        .into_iter()
        .map(|(object, rest)| (Entity { quantifier, object }, rest))
        .collect()
}

fn quantifier(t: Toks) -> Option<(Quantifier, Toks)> {
    let (first, rest) = t.split_first()?;
    let q = match first.word.as_str() {
        "the" => Quantifier::The,
        "a" | "an" | "any" => Quantifier::Any,
        "all" | "every" => Quantifier::All,
        _ => return None,
    };
    Some((q, rest))
}

/// `object := leaf | object ("that" ("is"|"are"))? location`, with the
/// left recursion unrolled: a leaf followed by 0, 1, 2, … relative
/// clauses. Every attachment depth is returned.
fn object(t: Toks) -> Vec<(Object, Toks)> {
    let mut results: Vec<(Object, Toks)> = match leaf(t) {
        Some((d, rest)) => vec![(Object::Leaf(d), rest)],
        None => return Vec::new(),
    };
    let mut frontier = results.clone();
    while !frontier.is_empty() {
        let mut extended = Vec::new();
        for (object, rest) in &frontier {
            for start in relative_glue(rest) {
                for (loc, rest) in location(start) {
                    extended.push((
                        Object::Nested {
                            object: Box::new(object.clone()),
                            location: loc,
                        },
                        rest,
                    ));
                }
            }
        }
        results.extend(extended.iter().cloned());
        frontier = extended;
    }
    results
}

/// The optional "that is" / "that are" glue before a relative clause.
fn relative_glue<'a>(t: &Toks<'a>) -> Vec<Toks<'a>> {
    let mut starts = vec![*t];
    for glue in [&["that", "is"][..], &["that", "are"][..]].iter() {
        if let Some(rest) = eat_seq(t, glue) {
            starts.push(rest);
        }
    }
    starts
}

fn leaf(t: Toks) -> Option<(ObjectDescription, Toks)> {
    let mut rest = t;
    let mut size = None;
    if let Some((s, r)) = rest.split_first().and_then(|(w, r)| size_word(&w.word).map(|s| (s, r))) {
        size = Some(s);
        rest = r;
    }
    let mut color = None;
    if let Some((c, r)) = rest.split_first().and_then(|(w, r)| color_word(&w.word).map(|c| (c, r))) {
        color = Some(c);
        rest = r;
    }
    let (form_token, rest) = rest.split_first()?;
    let form = form_word(&form_token.word)?;
    Some((ObjectDescription { form, size, color }, rest))
}

fn size_word(w: &str) -> Option<Size> {
    match w {
        "small" | "tiny" => Some(Size::Small),
        "large" | "big" => Some(Size::Large),
        _ => None,
    }
}

fn color_word(w: &str) -> Option<Color> {
    match w {
        "black" => Some(Color::Black),
        "white" => Some(Color::White),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "blue" => Some(Color::Blue),
        "yellow" => Some(Color::Yellow),
        _ => None,
    }
}

fn form_word(w: &str) -> Option<Form> {
    match w {
        "brick" | "bricks" => Some(Form::Brick),
        "plank" | "planks" => Some(Form::Plank),
        "ball" | "balls" => Some(Form::Ball),
        "box" | "boxes" => Some(Form::Box),
        "pyramid" | "pyramids" => Some(Form::Pyramid),
        "table" | "tables" => Some(Form::Table),
        "object" | "objects" | "thing" | "things" | "one" | "ones" => Some(Form::Anyform),
        "floor" => Some(Form::Floor),
        _ => None,
    }
}

fn location(t: Toks) -> Vec<(Location, Toks)> {
    let mut out = Vec::new();

    if let Some(rest) = eat(t, "between") {
        for (e1, rest) in entity(rest) {
            if let Some(rest) = eat(rest, "and") {
                for (e2, rest) in entity(rest) {
                    out.push((
                        Location {
                            relation: Relation::Between,
                            entity: Box::new(e1.clone()),
                            entity2: Some(Box::new(e2)),
                        },
                        rest,
                    ));
                }
            }
        }
    }

    for (relation, rest) in relation(t) {
        for (e, rest) in entity(rest) {
            out.push((
                Location {
                    relation,
                    entity: Box::new(e),
                    entity2: None,
                },
                rest,
            ));
        }
    }

    out
}

/// Every relation phrase that matches a prefix of the tokens. Phrases
/// may overlap ("on" and "on top of"), so all matches are returned and
/// the dead ends die downstream.
fn relation(t: Toks) -> Vec<(Relation, Toks)> {
    const PHRASES: &[(&[&str], Relation)] = &[
        (&["left", "of"], Relation::LeftOf),
        (&["to", "the", "left", "of"], Relation::LeftOf),
        (&["right", "of"], Relation::RightOf),
        (&["to", "the", "right", "of"], Relation::RightOf),
        (&["beside"], Relation::Beside),
        (&["next", "to"], Relation::Beside),
        (&["above"], Relation::Above),
        (&["under"], Relation::Under),
        (&["below"], Relation::Under),
        (&["on", "top", "of"], Relation::OnTop),
        (&["on"], Relation::OnTop),
        (&["onto"], Relation::OnTop),
        (&["inside"], Relation::Inside),
        (&["in"], Relation::Inside),
        (&["into"], Relation::Inside),
    ];
    PHRASES
        .iter()
        .filter_map(|(phrase, relation)| eat_seq(t, phrase).map(|rest| (*relation, rest)))
        .collect()
}
