//! Error display formatting for the CLI.

use crate::constants;
use crate::error::Error;

/// Prints an error message to stderr, with a hint where one helps.
pub fn print_error(error: &Error) {
    eprintln!("{error}");
    match error {
        Error::Config(_) => eprintln!(
            "\nHint: Check the profiles in '{}' or set {} to another directory.",
            constants::CONFIG_FILE_NAME,
            constants::ENV_CONFIG_DIR
        ),
        Error::PluginConfig(_) => eprintln!(
            "\nHint: Each entry under 'authenticators' in '{}' needs a 'name' and a 'path'.",
            constants::PLUGINS_FILE_NAME
        ),
        _ => {}
    }
}
