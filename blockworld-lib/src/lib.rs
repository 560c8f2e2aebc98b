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

//! Blockworld turns natural-language commands about a simulated blocks
//! world into executable gripper plans.
//!
//! The pipeline runs utterance → [`grammar`] (all parses) →
//! [`interpret`] (reference resolution, quantifier semantics, DNF goal
//! formula, clarification) → [`planner`] (A\* over `(held, stacks)`
//! states via [`search`]) → action steps. [`engine`] ties the stages
//! together and owns the error-suppression policy across multiple
//! parses.

pub mod engine;
pub mod explain;
pub mod grammar;
pub mod interpret;
pub mod logic;
pub mod physics;
pub mod planner;
pub mod search;
pub mod world;
