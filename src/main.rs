use std::process::exit;

use colored::Colorize;

fn main() {
    if let Err(e) = lazypick::app::run_cli() {
        eprintln!("{} {}", "[!]".bold().red(), e);
        exit(1);
    }
}
