use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use textrelay_cli::report::{problems, render_text, wait_for_settle};
use textrelay_cli::{CliConfig, LoopbackProvider};
use textrelay_core::{DispatchState, RelayError, Session};

#[derive(Parser, Debug)]
#[command(name = "textrelay", about = "Send one text message to a list of recipients", version)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, short = 'm')]
    message: String,
    /// Recipient address; repeat for more than one.
    #[arg(long = "to", short = 't', required = true)]
    to: Vec<String>,
    #[arg(long, default_value_t = 2000)]
    wait_ms: u64,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CliConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CliConfig::default(),
    };

    let provider = Arc::new(LoopbackProvider::current(config.loopback.clone()));
    let mut session = Session::from_config(provider, &config.session);
    session.set_message(args.message.as_str());
    for (index, address) in args.to.iter().enumerate() {
        if index > 0 {
            session.add_recipient();
        }
        session.update_recipient(index, address);
        session.format_recipient(index);
    }

    let mut watch = session.subscribe();
    let report = match session.dispatch() {
        Ok(report) => report,
        Err(RelayError::NotReady { reason }) => {
            for problem in problems(&session.snapshot()) {
                eprintln!("{problem}");
            }
            log::error!("not dispatching: {reason}");
            return Ok(ExitCode::from(2));
        }
        Err(err) => return Err(err.into()),
    };
    log::info!(
        "dispatched batch g{} to {} recipient(s), {} rejected",
        report.generation,
        report.slots,
        report.rejected
    );

    let snapshot = wait_for_settle(&mut watch, Duration::from_millis(args.wait_ms)).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render_text(&snapshot));
    }

    let all_delivered = snapshot
        .recipients
        .iter()
        .all(|recipient| recipient.delivery == Some(DispatchState::Delivered));
    Ok(if all_delivered { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
