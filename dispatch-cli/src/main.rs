//! Entry point for the dispatch command-line interface.
#![forbid(unsafe_code)]

fn main() {
    env_logger::init();
    if let Err(err) = dispatch_cli::run() {
        eprintln!("dispatch: {err}");
        std::process::exit(1);
    }
}
