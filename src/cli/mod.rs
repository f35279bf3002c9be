pub mod app;
pub mod errors;
pub mod tracing_init;

pub use app::App;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "cmdgen",
    version,
    about = "Command-line client generated at runtime from OpenAPI definitions",
    long_about = "Every definition under the definitions directory becomes a command.\n\
                  Operations are grouped by their first tag and named after their\n\
                  operation id.\n\n\
                  Examples:\n  \
                  cmdgen orchestrator buckets upload --folder-id 1 --key 2 --path a.txt --file a.txt\n  \
                  cmdgen du digitization digitize --file invoice.pdf\n  \
                  cmdgen orchestrator --help",
    disable_help_flag = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase diagnostic logging on stderr (-v debug, -vv trace)
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbosity: u8,

    /// `<definition> <group> <command> [--flag value]...`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
