//! `append` — consume stdin as a sequence of whole journal records and
//! append them to a live journal (§4.C, §6).

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

/// Append records read from standard input onto an existing journal.
#[derive(Parser)]
#[command(name = "append")]
struct Args {
    /// Journal to append to.
    journal: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = (|| -> anyhow::Result<()> {
        let mut journal = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&args.journal)
            .with_context(|| format!("opening journal {}", args.journal.display()))?;
        let mut stdin = std::io::stdin().lock();
        postman_journal::append::append(&mut journal, &mut stdin)
            .context("appending records to journal")
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("append: {err:#}");
            ExitCode::FAILURE
        }
    }
}
