// Blockworld, a natural-language planner for a blocks world
// Copyright (C) 2022 University College London

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::path::Path;
use std::time::Duration;
use std::{fs, process};

use clap::{arg, crate_version, Arg, Command};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use codespan_reporting::term::{self, Config};
use colored::Colorize;
use petgraph::dot::{Config as DotConfig, Dot};
use ptree::write_tree;

use blockworld_lib::engine::{self, EngineError};
use blockworld_lib::explain;
use blockworld_lib::grammar;
use blockworld_lib::planner::{self, PlanOptions};
use blockworld_lib::world::{examples, WorldState};

fn load_world_or_exit(spec: &str) -> WorldState {
    if let Some(world) = examples::builtin(spec) {
        return world.clone();
    }
    let content = match fs::read_to_string(Path::new(spec)) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Error reading {}: {}", spec, err);
            process::exit(1);
        }
    };
    match content.parse::<WorldState>() {
        Ok(world) => world,
        Err(err) => {
            eprintln!("Error parsing world {}: {}", spec, err);
            process::exit(1);
        }
    }
}

fn report_error_and_exit(
    error: &EngineError,
    utterance: &str,
    writer: &StandardStream,
    config: &Config,
) -> ! {
    let diagnostic = error.to_diagnostic();
    let file = SimpleFile::new("utterance", utterance.to_string());
    term::emit(&mut writer.lock(), config, &file, &diagnostic)
        .expect("Error when printing to stderr.");
    process::exit(1)
}

fn main() {
    let matches = Command::new("blockworld")
        .version(crate_version!())
        .about("A natural-language instruction planner for a blocks world")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("plan")
                .about("Interpret an utterance and print the action plan.")
                .arg(
                    Arg::new("WORLD")
                        .required(true)
                        .help("A built-in world name or a path to a world JSON file")
                        .index(1),
                )
                .arg(
                    Arg::new("UTTERANCE")
                        .required(true)
                        .help("The command to interpret")
                        .long_help("The command to interpret\n\
                                    Prefix the text with (N) to select the Nth reading of an \
                                    ambiguous utterance.")
                        .index(2),
                )
                .arg(
                    Arg::new("TIMEOUT")
                        .long("timeout")
                        .value_name("MS")
                        .takes_value(true)
                        .required(false)
                        .default_value("10000")
                        .help("Search budget in milliseconds"),
                )
                .arg(arg!(-e --explain "Print the parse trees and the goal formula before planning."))
                .arg(arg!(-g --graph "Output the explored search graph as Graphviz DOT instead of the plan.")),
        )
        .subcommand(
            Command::new("check")
                .about("Validate a world definition against the stacking laws.")
                .arg(
                    Arg::new("WORLD")
                        .required(true)
                        .help("A built-in world name or a path to a world JSON file")
                        .index(1),
                ),
        )
        .subcommand(Command::new("worlds").about("List the built-in worlds."))
        .get_matches();

    let out_writer = StandardStream::stdout(ColorChoice::Auto);
    let err_writer = StandardStream::stderr(ColorChoice::Auto);
    let config = Config::default();

    match matches.subcommand().unwrap() {
        ("plan", sub) => {
            let world = load_world_or_exit(sub.value_of("WORLD").unwrap());
            if let Err(err) = world.validate() {
                eprintln!("{}: {}", "invalid world".red().bold(), err);
                process::exit(1);
            }
            let utterance = sub.value_of("UTTERANCE").unwrap();
            let timeout: u64 = match sub.value_of("TIMEOUT").unwrap().parse() {
                Ok(timeout) => timeout,
                Err(_) => {
                    eprintln!("invalid timeout - expected a number of milliseconds");
                    process::exit(1);
                }
            };
            let options = PlanOptions {
                timeout: Duration::from_millis(timeout),
            };

            if sub.is_present("explain") {
                if let Ok(commands) = grammar::parse(utterance) {
                    for command in &commands {
                        let tree = explain::parse_tree(command);
                        write_tree(&tree, &mut out_writer.lock())
                            .expect("Error when printing tree to stdout.");
                    }
                }
                if let Ok(interpretation) = engine::interpret_utterance(utterance, &world) {
                    let tree = explain::interpretation_tree(
                        &interpretation.command,
                        &interpretation.formula,
                    );
                    write_tree(&tree, &mut out_writer.lock())
                        .expect("Error when printing tree to stdout.");
                }
            }

            if sub.is_present("graph") {
                match engine::interpret_utterance(utterance, &world) {
                    Ok(interpretation) => {
                        let (graph, result) =
                            planner::plan_with_graph(&interpretation.formula, &world, &options);
                        println!("{:?}", Dot::with_config(&graph, &[DotConfig::EdgeNoLabel]));
                        if let Err(error) = result {
                            report_error_and_exit(
                                &error.into(),
                                utterance,
                                &err_writer,
                                &config,
                            );
                        }
                    }
                    Err(error) => {
                        report_error_and_exit(&error, utterance, &err_writer, &config)
                    }
                }
                return;
            }

            match engine::plan_utterance(utterance, &world, &options) {
                Ok(steps) => {
                    println!("plan for {}", utterance.underline());
                    for step in steps {
                        println!("{}", step);
                    }
                }
                Err(error) => report_error_and_exit(&error, utterance, &err_writer, &config),
            }
        }
        ("check", sub) => {
            let spec = sub.value_of("WORLD").unwrap();
            let world = load_world_or_exit(spec);
            match world.validate() {
                Ok(()) => println!("{} {}", "ok".green().bold(), spec),
                Err(err) => {
                    eprintln!("{}: {}", "invalid world".red().bold(), err);
                    process::exit(1);
                }
            }
        }
        ("worlds", _) => {
            for name in examples::NAMES {
                let world = examples::builtin(name).expect("listed world exists");
                println!(
                    "{} ({} stacks, {} objects)",
                    name.bold(),
                    world.stacks.len(),
                    world.objects.len()
                );
                for example in &world.examples {
                    println!("  {}", example);
                }
            }
        }
        _ => (),
    }
}
