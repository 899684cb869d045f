use clap::Parser;
use event_notifier::config::{AppConfig, Backend, GoogleConfig};
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";
const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

pub(crate) enum RunOutcome {
    Serve(AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match resolve_config(&cli) {
        Ok(config) => RunOutcome::Serve(config),
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "event-notifier",
    version,
    about = "Push notifications and reminders for event documents"
)]
struct Cli {
    #[arg(long, env = "EVENT_NOTIFIER_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    #[arg(long, env = "EVENT_NOTIFIER_PROJECT_ID")]
    project_id: Option<String>,
    #[arg(long, env = "EVENT_NOTIFIER_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
    #[arg(long, env = "EVENT_NOTIFIER_FIRESTORE_ENDPOINT")]
    firestore_endpoint: Option<String>,
    #[arg(long, env = "EVENT_NOTIFIER_FCM_ENDPOINT")]
    fcm_endpoint: Option<String>,
    #[arg(long, env = "EVENT_NOTIFIER_REMINDER_INTERVAL", default_value = "60m")]
    reminder_interval: String,
    #[arg(long)]
    in_memory: bool,
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, String> {
    let reminder_interval = parse_interval(&cli.reminder_interval)?;
    let backend = if cli.in_memory {
        Backend::InMemory
    } else {
        Backend::Google(resolve_google_config(cli)?)
    };

    Ok(AppConfig {
        listen: cli.listen,
        backend,
        reminder_interval,
    })
}

fn resolve_google_config(cli: &Cli) -> Result<GoogleConfig, String> {
    let project_id = cli
        .project_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or("--project-id is required unless using --in-memory")?;
    let access_token = cli
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or("--access-token is required unless using --in-memory")?;

    Ok(GoogleConfig {
        project_id: project_id.to_string(),
        access_token: access_token.to_string(),
        firestore_endpoint: cli
            .firestore_endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_FIRESTORE_ENDPOINT.to_string()),
        fcm_endpoint: cli
            .fcm_endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_FCM_ENDPOINT.to_string()),
    })
}

/// `0` disables the loop.
fn parse_interval(raw: &str) -> Result<Option<Duration>, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("reminder interval cannot be empty".to_string());
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: u64 = amount.parse().map_err(|_| {
        format!("invalid reminder interval '{value}'; expected <number>[s|m|h]")
    })?;
    if amount == 0 {
        return Ok(None);
    }

    let seconds = match unit {
        's' => Some(amount),
        'm' => amount.checked_mul(60),
        'h' => amount.checked_mul(60 * 60),
        _ => None,
    };
    seconds
        .map(|seconds| Some(Duration::from_secs(seconds)))
        .ok_or_else(|| format!("invalid reminder interval '{value}'; expected <number>[s|m|h]"))
}
