//! `init` — create a fresh journal, or rebuild a live one from a mail
//! directory (§4.B, §6).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;

/// Create or rebuild a postman journal.
///
/// Fresh mode takes a single path: `init <new-file>`. Rebuild mode takes
/// all three: `init <existing-journal> <temp-name> <mail-dir>`.
#[derive(Parser)]
#[command(name = "init")]
struct Args {
    /// Journal to create (fresh mode) or rebuild (rebuild mode).
    path: PathBuf,

    /// Rebuild mode only: scratch file built before the atomic exchange.
    temp: Option<PathBuf>,

    /// Rebuild mode only: mail directory to scan for message files.
    mail_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = match (&args.temp, &args.mail_dir) {
        (None, None) => postman_journal::init::create_fresh(&args.path)
            .with_context(|| format!("creating fresh journal at {}", args.path.display())),
        (Some(temp), Some(mail_dir)) => postman_journal::init::rebuild(&args.path, temp, mail_dir)
            .with_context(|| format!("rebuilding journal {}", args.path.display())),
        _ => Err(anyhow!(
            "usage: init <new-file> | init <existing-journal> <temp-name> <mail-dir>"
        )),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("init: {err:#}");
            ExitCode::FAILURE
        }
    }
}
