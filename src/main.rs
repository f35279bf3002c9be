use clap::Parser;
use cmdgen_cli::cli::errors::print_error;
use cmdgen_cli::cli::tracing_init::init_tracing;
use cmdgen_cli::cli::{App, Cli};
use cmdgen_cli::engine::context::InputStream;
use std::io::IsTerminal;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let app = match App::from_env() {
        Ok(app) => app,
        Err(e) => {
            init_tracing(cli.verbosity, false);
            print_error(&e);
            std::process::exit(e.exit_code());
        }
    };
    init_tracing(cli.verbosity, app.debug_requested(&cli.args));

    let input = (!std::io::stdin().is_terminal()).then(InputStream::stdin);
    let mut stdout = tokio::io::stdout();
    if let Err(e) = app.run(&cli.args, input, &mut stdout).await {
        print_error(&e);
        std::process::exit(e.exit_code());
    }
}
