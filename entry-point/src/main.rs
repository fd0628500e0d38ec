//! `maskrcnn-entry-point` binary.
//!
//! Every argument after the program name belongs to the training script, so
//! this binary parses no flags of its own; see the `config` module for the
//! `ENTRY_POINT_*` settings.
use maskrcnn_entry_point::init_logging;
use maskrcnn_entry_point::run_main;

fn main() {
    init_logging();

    let exit_code = match run_main(std::env::args_os().skip(1)) {
        Ok(code) => code,
        #[allow(clippy::print_stderr)]
        Err(err) => {
            eprintln!("Error: {err}");
            err.exit_code()
        }
    };

    std::process::exit(exit_code);
}
