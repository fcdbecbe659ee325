//! `pop3` — speak the POP3 protocol on stdin/stdout against a mail
//! directory and its journal (§4.F–§4.I, §6).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use postman::config::Config;
use postman_pop3::{Pop3Error, Session};

/// Speak POP3 on standard input/output against a journal-backed maildrop.
#[derive(Parser)]
#[command(name = "pop3")]
struct Args {
    /// Directory holding the individual message files.
    mail_dir: PathBuf,

    /// Journal indexing `mail_dir`.
    journal: PathBuf,

    /// Optional TOML file with a `[credentials]` table. Without one, any
    /// username/password is accepted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let check_credentials: Box<dyn Fn(&str, &[u8]) -> bool> = match args.config {
        Some(path) => match Config::load(&path).with_context(|| {
            format!("loading credential config {}", path.display())
        }) {
            Ok(config) => config.into_check(),
            Err(err) => {
                eprintln!("pop3: {err:#}");
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(|_: &str, _: &[u8]| true),
    };

    let journal = match postman_journal::open_readonly(&args.journal)
        .with_context(|| format!("opening journal {}", args.journal.display()))
    {
        Ok(journal) => journal,
        Err(err) => {
            eprintln!("pop3: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut session = Session::new(
        stdin.lock(),
        stdout.lock(),
        &journal,
        args.mail_dir,
        check_credentials,
    );

    match session.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(Pop3Error::WriteFailed) => ExitCode::from(2),
        Err(err) => {
            eprintln!("pop3: {err:#}");
            ExitCode::FAILURE
        }
    }
}
