use std::process;

mod cli;
mod logging;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match cli::parse_args(&args) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("error: {err}\n\n{}", cli::usage());
            process::exit(1);
        }
    };
    let cli::Command::Run(args) = command else {
        print!("{}", cli::usage());
        return;
    };

    logging::setup_tracing(logging::level_for(args.verbose, args.quiet));
    tracing::info!("bathyfilter {} starting", env!("CARGO_PKG_VERSION"));

    if let Err(err) = cli::run(&args) {
        eprintln!("bathyfilter error: {err}");
        process::exit(1);
    }
}
