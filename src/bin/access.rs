//! `access` — grant, deny, or update per-user read windows on a live
//! journal (§4.D, §6).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use postman_journal::access::Action;

/// Manage per-user access windows on a postman journal.
///
/// Exactly one of `-d`/`-u`/`-a` selects the action; the usernames
/// following it are applied in order.
#[derive(Parser)]
#[command(name = "access")]
#[command(group(
    clap::ArgGroup::new("action")
        .args(["deny", "update", "grant"])
        .required(true)
        .multiple(false)
))]
struct Args {
    /// Journal to operate on.
    journal: PathBuf,

    /// Deny: pin each user's window to the current commit marker.
    #[arg(short = 'd', long, num_args = 1.., value_name = "USER")]
    deny: Vec<String>,

    /// Update: reset each user's window to the current commit marker.
    #[arg(short = 'u', long, num_args = 1.., value_name = "USER")]
    update: Vec<String>,

    /// Grant: remove each user's window, falling back to the global marker.
    #[arg(short = 'a', long, num_args = 1.., value_name = "USER")]
    grant: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let (action, usernames): (Action, &[String]) = if !args.deny.is_empty() {
        (Action::Deny, &args.deny)
    } else if !args.update.is_empty() {
        (Action::Update, &args.update)
    } else {
        (Action::Grant, &args.grant)
    };

    let result = (|| -> anyhow::Result<()> {
        let journal = postman_journal::open_read_write(&args.journal)
            .with_context(|| format!("opening journal {}", args.journal.display()))?;
        postman_journal::access::apply_all(
            &journal,
            action,
            usernames.iter().map(String::as_str),
        )
        .context("applying access change")
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("access: {err:#}");
            ExitCode::FAILURE
        }
    }
}
