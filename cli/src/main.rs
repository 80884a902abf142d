use anyhow::{anyhow, bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskpay_core::{
    CompletionStatus, GenerationKind, LedgerConfig, RedemptionId, RedemptionRequest,
    RedemptionStatus, SubmissionId, TaskId, UserId,
};
use taskpay_ledger::RewardLedger;
use taskpay_store::{MemoryStore, Snapshot};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let user = || Arg::new("user").long("user").required(true).help("User id");

    Command::new("taskpay")
        .version(taskpay_ledger::VERSION)
        .about("Credits-for-tasks reward ledger")
        .subcommand_required(true)
        .arg(
            Arg::new("state")
                .long("state")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Snapshot JSON file; a missing file starts an empty ledger"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Ledger TOML configuration"),
        )
        .arg(
            Arg::new("write")
                .long("write")
                .action(ArgAction::SetTrue)
                .help("Persist the updated snapshot back to the state file"),
        )
        .subcommand(
            Command::new("register")
                .about("Register a user")
                .arg(Arg::new("name").long("name").required(true).help("Display name"))
                .arg(Arg::new("code").long("code").help("Referral code of the referrer")),
        )
        .subcommand(
            Command::new("complete")
                .about("Complete a task")
                .arg(user())
                .arg(Arg::new("task").long("task").required(true).help("Task id"))
                .arg(
                    Arg::new("pending")
                        .long("pending")
                        .action(ArgAction::SetTrue)
                        .help("Queue proof for review instead of settling"),
                ),
        )
        .subcommand(
            Command::new("review")
                .about("Approve or reject a proof submission")
                .arg(Arg::new("submission").long("submission").required(true).help("Submission id"))
                .arg(
                    Arg::new("reject")
                        .long("reject")
                        .action(ArgAction::SetTrue)
                        .help("Reject instead of approve"),
                ),
        )
        .subcommand(
            Command::new("spend")
                .about("Spend credits on a generation")
                .arg(user())
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .value_parser(["image", "video", "ad-copy", "social-post"]),
                ),
        )
        .subcommand(
            Command::new("redeem")
                .about("Request a data or airtime redemption")
                .arg(user())
                .arg(
                    Arg::new("data")
                        .long("data")
                        .value_parser(value_parser!(i64))
                        .conflicts_with("airtime")
                        .required_unless_present("airtime")
                        .help("Megabytes of data"),
                )
                .arg(
                    Arg::new("airtime")
                        .long("airtime")
                        .value_parser(value_parser!(Decimal))
                        .help("Naira of airtime"),
                )
                .arg(Arg::new("phone").long("phone").required(true).help("Phone number to top up")),
        )
        .subcommand(
            Command::new("resolve")
                .about("Complete or reject a pending redemption")
                .arg(Arg::new("redemption").long("redemption").required(true).help("Redemption id"))
                .arg(
                    Arg::new("status")
                        .long("status")
                        .required(true)
                        .value_parser(["completed", "rejected"]),
                ),
        )
        .subcommand(Command::new("tasks").about("List the task catalog"))
        .subcommand(Command::new("balances").about("Show a user's balances").arg(user()))
        .subcommand(Command::new("history").about("Show a user's credit history").arg(user()))
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing --{name}"))
}

fn generation_kind(name: &str) -> Result<GenerationKind> {
    Ok(match name {
        "image" => GenerationKind::Image,
        "video" => GenerationKind::Video,
        "ad-copy" => GenerationKind::AdCopy,
        "social-post" => GenerationKind::SocialPost,
        other => bail!("unknown generation kind {other}"),
    })
}

fn load_state(path: &Path) -> Result<Snapshot> {
    if path.exists() {
        Snapshot::load(path).with_context(|| format!("loading state from {}", path.display()))
    } else {
        tracing::info!("State file {} not found; starting empty", path.display());
        Ok(Snapshot::default())
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn execute(ledger: &RewardLedger<MemoryStore>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("register", args)) => {
            let name = required(args, "name")?;
            let code = args.get_one::<String>("code").map(String::as_str);
            print(&ledger.register_user(name, code).await?)
        }
        Some(("complete", args)) => {
            let user = UserId::from(required(args, "user")?);
            let task = TaskId::from(required(args, "task")?);
            if args.get_flag("pending") {
                print(&ledger.submit_for_review(&user, &task).await?)
            } else {
                print(&ledger.complete_task(&user, &task, CompletionStatus::Completed).await?)
            }
        }
        Some(("review", args)) => {
            let submission = SubmissionId::from(required(args, "submission")?);
            print(&ledger.review_submission(&submission, !args.get_flag("reject")).await?)
        }
        Some(("spend", args)) => {
            let user = UserId::from(required(args, "user")?);
            let kind = generation_kind(required(args, "kind")?)?;
            print(&ledger.spend_credits(&user, kind).await?)
        }
        Some(("redeem", args)) => {
            let user = UserId::from(required(args, "user")?);
            let request = match (args.get_one::<i64>("data"), args.get_one::<Decimal>("airtime")) {
                (Some(&megabytes), _) => RedemptionRequest::Data { megabytes },
                (None, Some(&naira)) => RedemptionRequest::Airtime { naira },
                (None, None) => bail!("one of --data or --airtime is required"),
            };
            let phone = required(args, "phone")?;
            print(&ledger.request_redemption(&user, request, phone).await?)
        }
        Some(("resolve", args)) => {
            let redemption = RedemptionId::from(required(args, "redemption")?);
            let target = match required(args, "status")? {
                "completed" => RedemptionStatus::Completed,
                _ => RedemptionStatus::Rejected,
            };
            print(&ledger.resolve_redemption(&redemption, target).await?)
        }
        Some(("tasks", _)) => print(&ledger.tasks().await?),
        Some(("balances", args)) => {
            let user = UserId::from(required(args, "user")?);
            print(&ledger.balances(&user).await?)
        }
        Some(("history", args)) => {
            let user = UserId::from(required(args, "user")?);
            print(&ledger.transactions(&user).await?)
        }
        _ => bail!("no command given"),
    }
}

async fn run(matches: ArgMatches) -> Result<()> {
    let state = matches
        .get_one::<PathBuf>("state")
        .ok_or_else(|| anyhow!("missing --state"))?;
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };

    let store = MemoryStore::from_snapshot(load_state(state)?)?;
    let ledger = RewardLedger::new(Arc::new(store), config)?;

    execute(&ledger, &matches).await?;

    if matches.get_flag("write") {
        ledger.store().snapshot().save(state)?;
        tracing::debug!("Snapshot written to {}", state.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli().get_matches()).await {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(state: &Path, rest: &[&str]) -> ArgMatches {
        let mut argv = vec!["taskpay", "--state", state.to_str().unwrap(), "--write"];
        argv.extend_from_slice(rest);
        cli().try_get_matches_from(argv).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn redeem_needs_exactly_one_amount() {
        let base = ["taskpay", "--state", "s.json", "redeem", "--user", "u1", "--phone", "0803"];
        assert!(cli().try_get_matches_from(base).is_err());

        let mut both = base.to_vec();
        both.extend(["--data", "100", "--airtime", "50"]);
        assert!(cli().try_get_matches_from(both).is_err());
    }

    #[tokio::test]
    async fn register_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");

        run(args(&state, &["register", "--name", "Ada"])).await.unwrap();

        let snapshot = Snapshot::load(&state).unwrap();
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].name, "Ada");
    }

    #[tokio::test]
    async fn negative_config_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let config = dir.path().join("ledger.toml");
        std::fs::write(&config, "signup_bonus = -5\n").unwrap();
        let config = config.to_str().unwrap();

        let err = run(args(&state, &["--config", config, "tasks"])).await.unwrap_err();
        assert!(err.to_string().contains("signup_bonus"));
    }

    #[tokio::test]
    async fn failed_command_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");

        let err = run(args(&state, &["balances", "--user", "ghost"])).await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert!(!state.exists());
    }
}
