//! Main `LiveWorks` binary command line arguments options.
//!
//! This module declares a function to build `clap` command line arguments
//! parser, so that it can be used from other places than the main binary,
//! such as from bash completion file generator.

use clap::{value_parser, Arg, ArgAction, Command};
use clap_complete::Shell;
use lw_analysis::WorklistOrder;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

fn arg_debug() -> Arg {
    Arg::new("debug")
        .short('d')
        .long("debug")
        .action(ArgAction::SetTrue)
        .help("Activate debug mode")
}

fn arg_verbose() -> Arg {
    Arg::new("verbose")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue)
        .help("Activate verbose mode")
}

fn arg_ecslog() -> Arg {
    Arg::new("ecslog")
        .short('e')
        .long("ecslog")
        .action(ArgAction::SetTrue)
        .help("Output logs in ECS format")
}

fn arg_input() -> Arg {
    Arg::new("input")
        .short('i')
        .long("input")
        .action(ArgAction::Set)
        .help("Input source file (standard input if missing or `-`)")
}

fn arg_output(help: &str) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .action(ArgAction::Set)
        .help(help.to_string())
}

fn arg_filter_class() -> Arg {
    Arg::new("filter-class")
        .long("filter-class")
        .action(ArgAction::Set)
        .help("Class(es) regex filter")
}

fn arg_filter_method() -> Arg {
    Arg::new("filter-method")
        .long("filter-method")
        .action(ArgAction::Set)
        .help("Method(s) regex filter")
}

fn arg_order() -> Arg {
    Arg::new("order")
        .long("order")
        .action(ArgAction::Set)
        .value_parser(WorklistOrder::NAMES.to_vec())
        .help("Initial worklist order of the solver")
}

fn arg_json() -> Arg {
    Arg::new("json")
        .short('j')
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print results as JSON")
}

#[must_use]
pub fn liveworks() -> Command {
    Command::new(NAME)
        .version(VERSION)
        .author(AUTHORS)
        .about(DESCRIPTION)
        .subcommand(cfg())
        .subcommand(deadstores())
        .subcommand(liveness())
        .subcommand(
            Command::new("gen-completions")
                .about("Generates completions file")
                .arg(
                    Arg::new("shell")
                        .short('s')
                        .long("shell")
                        .action(ArgAction::Set)
                        .value_parser(value_parser!(Shell))
                        .required(true)
                        .help("Shell type for completion generation"),
                ),
        )
}

#[must_use]
pub fn cfg() -> Command {
    Command::new("cfg")
        .bin_name("lw-cfg")
        .version(VERSION)
        .author(AUTHORS)
        .about("Builds methods control flow graphs")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_output("Dot output directory"))
        .arg(arg_filter_class())
        .arg(arg_filter_method())
        .arg(arg_order())
        .arg(
            Arg::new("stats")
                .short('s')
                .long("stats")
                .action(ArgAction::SetTrue)
                .help("Print graph and solver statistics"),
        )
}

#[must_use]
pub fn deadstores() -> Command {
    Command::new("deadstores")
        .bin_name("lw-deadstores")
        .version(VERSION)
        .author(AUTHORS)
        .about("Reports assignments whose value is never read")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_filter_class())
        .arg(arg_filter_method())
        .arg(arg_json())
}

#[must_use]
pub fn liveness() -> Command {
    Command::new("liveness")
        .bin_name("lw-liveness")
        .version(VERSION)
        .author(AUTHORS)
        .about("Prints live variables before each statement")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_output("Output file"))
        .arg(arg_filter_class())
        .arg(arg_filter_method())
        .arg(arg_order())
        .arg(arg_json())
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .action(ArgAction::SetTrue)
                .help("Disable colored output"),
        )
        .arg(
            Arg::new("registers")
                .short('r')
                .long("registers")
                .action(ArgAction::Set)
                .value_parser(value_parser!(usize))
                .help("Assign variables to the given number of registers"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_consistent() {
        liveworks().debug_assert();
    }

    #[test]
    fn subcommand_arguments() {
        let args = liveworks()
            .try_get_matches_from([NAME, "liveness", "-i", "a.java", "--order", "rpo", "--json"])
            .unwrap();
        let (name, sub_args) = args.subcommand().unwrap();
        assert_eq!(name, "liveness");
        assert_eq!(sub_args.get_one::<String>("order").unwrap(), "rpo");
        assert!(sub_args.get_flag("json"));
        assert!(sub_args.get_one::<usize>("registers").is_none());

        let args = liveness()
            .try_get_matches_from(["lw-liveness", "-r", "4"])
            .unwrap();
        assert_eq!(args.get_one::<usize>("registers"), Some(&4));
        assert!(liveness()
            .try_get_matches_from(["lw-liveness", "--registers", "many"])
            .is_err());
        assert!(liveworks()
            .try_get_matches_from([NAME, "liveness", "--order", "random"])
            .is_err());
    }
}
