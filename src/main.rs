use clap::Parser;
use log::warn;
use snafu::ErrorCompat;

mod args;
mod pav;

fn main() {
    let args = args::Args::parse();

    let mut logging = env_logger::Builder::from_default_env();
    if args.verbose {
        logging.filter_level(log::LevelFilter::Debug);
    }
    logging.init();

    if let Err(e) = pav::run_election(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
