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

//! The pipeline: utterance in, plan out.
//!
//! Every parse of the utterance is interpreted independently and
//! per-parse failures are suppressed as long as one parse succeeds; only
//! when all fail is the first error surfaced. Parses whose goal formulas
//! coincide are merged. If distinct readings survive, the engine asks the
//! user to choose, and an `(N)` utterance prefix answers that question on
//! the next round.

use codespan_reporting::diagnostic::{Diagnostic, Label};
use itertools::Itertools;
use thiserror::Error;

use crate::grammar::{self, Command, ParseError};
use crate::interpret::{interpret, InterpretError};
use crate::logic::Dnf;
use crate::planner::{self, PlanError, PlanOptions, PlanStep};
use crate::world::WorldState;

/// One reading of an utterance: the chosen parse and its goal formula.
#[derive(Clone, PartialEq, Debug)]
pub struct Interpretation {
    pub command: Command,
    pub formula: Dnf,
}

#[derive(Error, Clone, PartialEq, Debug)]
pub enum EngineError {
    #[error("Parsing error: {0}")]
    Parse(#[from] ParseError),
    #[error("The utterance can be understood in different ways, do you want: {}", format_numbered(.0))]
    ParseChoice(Vec<String>),
    #[error("interpretation ({0}) does not exist")]
    NoSuchInterpretation(usize),
    #[error(transparent)]
    Interpret(#[from] InterpretError),
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),
}

fn format_numbered(descriptions: &[String]) -> String {
    descriptions
        .iter()
        .enumerate()
        .map(|(i, d)| format!("({}) {}", i, d))
        .join(" ")
}

impl EngineError {
    /// Render the error for terminal reporting. Parse errors carry a
    /// span into the utterance and become labelled diagnostics; the rest
    /// are plain messages.
    pub fn to_diagnostic(&self) -> Diagnostic<()> {
        match self {
            EngineError::Parse(parse_error) => {
                let mut diagnostic = Diagnostic::error().with_message("Parsing error");
                if let Some((offset, len)) = parse_error.span {
                    diagnostic = diagnostic.with_labels(vec![Label::primary(
                        (),
                        offset..offset + len,
                    )
                    .with_message(parse_error.message.clone())]);
                } else {
                    diagnostic = diagnostic.with_notes(vec![parse_error.message.clone()]);
                }
                diagnostic
            }
            other => Diagnostic::error().with_message(other.to_string()),
        }
    }
}

/// An optional `(N) ` prefix selects the Nth reading of the rest.
fn split_choice(utterance: &str) -> (Option<usize>, &str) {
    let trimmed = utterance.trim_start();
    if let Some(rest) = trimmed.strip_prefix('(') {
        if let Some(close) = rest.find(')') {
            if let Ok(n) = rest[..close].trim().parse::<usize>() {
                return (Some(n), &rest[close + 1..]);
            }
        }
    }
    (None, utterance)
}

/// Parse and interpret an utterance down to a single reading.
pub fn interpret_utterance(
    utterance: &str,
    world: &WorldState,
) -> Result<Interpretation, EngineError> {
    let (choice, text) = split_choice(utterance);
    let commands = grammar::parse(text)?;

    let mut interpretations: Vec<Interpretation> = Vec::new();
    let mut first_error: Option<InterpretError> = None;
    for command in commands {
        match interpret(&command, world) {
            Ok(formula) => {
                // two parses with the same goal are the same reading
                if !interpretations.iter().any(|i| i.formula == formula) {
                    interpretations.push(Interpretation { command, formula });
                }
            }
            Err(error) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    if interpretations.is_empty() {
        return Err(first_error
            .unwrap_or(InterpretError::NoValidInterpretation)
            .into());
    }
    match choice {
        Some(n) => interpretations
            .into_iter()
            .nth(n)
            .ok_or(EngineError::NoSuchInterpretation(n)),
        None if interpretations.len() > 1 => Err(EngineError::ParseChoice(
            interpretations
                .iter()
                .map(|i| i.command.to_string())
                .collect(),
        )),
        None => Ok(interpretations.into_iter().next().expect("nonempty")),
    }
}

/// The full pipeline: parse, interpret, clarify, plan.
pub fn plan_utterance(
    utterance: &str,
    world: &WorldState,
    options: &PlanOptions,
) -> Result<Vec<PlanStep>, EngineError> {
    let interpretation = interpret_utterance(utterance, world)?;
    Ok(planner::plan(&interpretation.formula, world, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{apply_plan, is_goal, Action, StateNode};
    use crate::world::examples::SMALL;

    fn plan_small(utterance: &str) -> Result<Vec<PlanStep>, EngineError> {
        plan_utterance(utterance, &SMALL, &PlanOptions::default())
    }

    #[test]
    fn take_the_white_ball_end_to_end() {
        let steps = plan_small("take the white ball").unwrap();
        assert_eq!(
            steps.last(),
            Some(&PlanStep::Action(Action::Pick))
        );
        assert!(steps
            .iter()
            .any(|s| s == &PlanStep::Narration("Picking up the white ball".to_owned())));
    }

    #[test]
    fn ambiguous_reference_asks_for_clarification() {
        match plan_small("take the ball") {
            Err(EngineError::Interpret(InterpretError::Clarify(descriptions))) => {
                assert_eq!(
                    descriptions,
                    vec![
                        "the large white ball".to_owned(),
                        "the small black ball".to_owned()
                    ]
                );
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn structural_ambiguity_asks_for_a_parse_choice() {
        match plan_small("put a ball in a box on the floor") {
            Err(EngineError::ParseChoice(descriptions)) => {
                assert_eq!(descriptions.len(), 2);
                assert!(descriptions.iter().all(|d| d.starts_with("move a ")));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn a_choice_prefix_selects_a_reading() {
        let error = plan_small("put a ball in a box on the floor").unwrap_err();
        let descriptions = match &error {
            EngineError::ParseChoice(d) => d.clone(),
            other => panic!("unexpected result {:?}", other),
        };
        for (i, description) in descriptions.iter().enumerate() {
            let utterance = format!("({}) put a ball in a box on the floor", i);
            let interpretation = interpret_utterance(&utterance, &SMALL).unwrap();
            assert_eq!(&interpretation.command.to_string(), description);
        }
        assert_eq!(
            interpret_utterance("(9) put a ball in a box on the floor", &SMALL),
            Err(EngineError::NoSuchInterpretation(9))
        );
    }

    #[test]
    fn the_error_suppression_policy_holds() {
        // Two parses: "move all balls into (a box on the floor)" has no
        // valid interpretation (one box cannot hold two balls), while
        // "move all (balls in a box) onto the floor" does. The failing
        // parse is suppressed.
        let utterance = "move all balls in a box on the floor";
        let interpretation = interpret_utterance(utterance, &SMALL).unwrap();
        assert_eq!(interpretation.formula, "ontop(f, floor)".parse().unwrap());
        let steps = plan_small(utterance).unwrap();
        assert!(steps
            .iter()
            .any(|s| s == &PlanStep::Narration("Picking up the black ball".to_owned())));
    }

    #[test]
    fn impossible_commands_have_no_interpretation() {
        assert_eq!(
            plan_small("move the floor left of the ball"),
            Err(EngineError::Interpret(InterpretError::NoValidInterpretation))
        );
    }

    #[test]
    fn nonsense_surfaces_a_parsing_error() {
        match plan_small("flarb the ball") {
            Err(EngineError::Parse(e)) => {
                assert!(e.message.contains("does not match"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn plans_replanned_from_their_end_state_are_already_true() {
        let utterance = "put the white ball in a large box";
        let interpretation = interpret_utterance(utterance, &SMALL).unwrap();
        let steps = plan_small(utterance).unwrap();
        let after = apply_plan(&SMALL, &steps);
        assert!(is_goal(
            &StateNode::from_world(&after),
            &interpretation.formula,
            &SMALL
        ));
        let again = plan_utterance(utterance, &after, &PlanOptions::default()).unwrap();
        assert_eq!(
            again,
            vec![PlanStep::Narration("That is already true!".to_owned())]
        );
    }

    #[test]
    fn timeouts_surface_as_planning_errors() {
        let options = PlanOptions {
            timeout: std::time::Duration::from_millis(0),
        };
        let error = plan_utterance("take the white ball", &SMALL, &options).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Planning error: Search for goal timed out!"
        );
    }

    #[test]
    fn parse_choice_errors_render_with_indices() {
        let error = EngineError::ParseChoice(vec!["take a ball".to_owned(), "take a box".to_owned()]);
        assert_eq!(
            error.to_string(),
            "The utterance can be understood in different ways, do you want: \
             (0) take a ball (1) take a box"
        );
    }

    #[test]
    fn diagnostics_carry_utterance_spans() {
        let error = plan_small("take the ball?").unwrap_err();
        let diagnostic = error.to_diagnostic();
        assert_eq!(diagnostic.message, "Parsing error");
        assert_eq!(diagnostic.labels[0].range, 13..14);
    }
}
