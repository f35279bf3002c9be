//! Builds clap command trees used to render help and listings.
//!
//! Argument binding does not go through clap: the generated commands only
//! describe what exists. Hidden and disabled commands are present but marked
//! `hide(true)` so they never show up in help output.

use crate::constants;
use crate::spec::{Command as SpecCommand, CommandParameter, CommandTree, ParameterType};
use clap::{Arg, ArgAction, Command};

const BIN_NAME: &str = "cmdgen";

/// Flags owned by the CLI itself; parameters with these names are shadowed
const RESERVED_FLAGS: &[&str] = &[
    constants::FLAG_DEBUG,
    constants::FLAG_INSECURE,
    constants::FLAG_PROFILE,
    constants::FLAG_OUTPUT,
    constants::FLAG_HELP,
];

/// Converts a String to a 'static str by leaking it
///
/// clap's builder takes `'static` names. The CLI renders help once and exits.
fn to_static_str(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

fn global_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(constants::FLAG_DEBUG)
                .long(constants::FLAG_DEBUG)
                .help("Print request and response details")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(constants::FLAG_INSECURE)
                .long(constants::FLAG_INSECURE)
                .help("Disable TLS certificate verification")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(constants::FLAG_PROFILE)
                .long(constants::FLAG_PROFILE)
                .help("Configuration profile to use")
                .value_name("NAME"),
        )
        .arg(
            Arg::new(constants::FLAG_OUTPUT)
                .long(constants::FLAG_OUTPUT)
                .help("Output format")
                .value_parser(["json", "text"]),
        )
}

/// Root listing of the available definitions
#[must_use]
pub fn generate_root(definitions: &[String]) -> Command {
    let mut root = global_args(
        Command::new(BIN_NAME)
            .about("Command-line client for APIs described by OpenAPI definitions"),
    );
    for name in definitions {
        root = root.subcommand(Command::new(to_static_str(name.clone())));
    }
    root
}

/// One definition with its groups and their commands
#[must_use]
pub fn generate_definition(tree: &CommandTree) -> Command {
    let bin_name = format!("{BIN_NAME} {}", tree.definition);
    let mut definition = global_args(
        Command::new(to_static_str(tree.definition.clone())).bin_name(bin_name.clone()),
    );
    if let Some(description) = &tree.description {
        definition = definition.about(description.clone());
    }

    for group in &tree.groups {
        let group_bin = format!("{bin_name} {}", group.name);
        let mut group_command =
            Command::new(to_static_str(group.name.clone())).bin_name(group_bin.clone());
        if tree.listed_groups().all(|listed| listed.name != group.name) {
            group_command = group_command.hide(true);
        }
        for command in tree.commands_in(group) {
            group_command = group_command.subcommand(generate_command(command, &group_bin));
        }
        definition = definition.subcommand(group_command);
    }
    definition
}

fn generate_command(command: &SpecCommand, group_bin: &str) -> Command {
    let mut generated = global_args(
        Command::new(to_static_str(command.name.clone()))
            .bin_name(format!("{group_bin} {}", command.name))
            .hide(!command.visibility.is_listed()),
    );
    if let Some(summary) = &command.summary {
        generated = generated.about(summary.clone());
    }
    if let Some(description) = &command.description {
        generated = generated.long_about(description.clone());
    }
    for parameter in command
        .parameters
        .iter()
        .filter(|p| !RESERVED_FLAGS.contains(&p.flag.as_str()))
    {
        generated = generated.arg(generate_arg(parameter));
    }
    generated
}

fn generate_arg(parameter: &CommandParameter) -> Arg {
    let flag = to_static_str(parameter.flag.clone());
    let mut help = parameter.description.clone().unwrap_or_default();
    if parameter.required {
        help = format!("{help} (required)").trim_start().to_string();
    }
    let arg = Arg::new(flag).long(flag).help(help);
    match &parameter.param_type {
        ParameterType::Boolean => arg.action(ArgAction::SetTrue),
        ParameterType::Array(_) => arg
            .value_name(to_static_str(parameter.param_type.type_name()))
            .action(ArgAction::Append),
        other => arg.value_name(to_static_str(other.type_name())),
    }
}
