// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand};

use relay_agent::api::ApiClient;
use relay_agent::persist;
use relay_agent::{AgentConfig, CredentialResolver};

#[derive(Parser)]
#[command(name = "relay-agent", version, about = "Local OAuth credential agent")]
struct Cli {
    #[command(flatten)]
    config: AgentConfig,

    /// Log filter (e.g. info, relay_agent=debug)
    #[arg(long, env = "RELAY_AGENT_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interactive handshake and store the credential record
    Login,
    /// Print a fresh access token, authenticating if necessary
    Token,
    /// Show the stored credential record's status
    Status,
    /// GET a URL with a bearer token and print the JSON response
    Get { url: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let resolver = CredentialResolver::new(cli.config);

    match cli.command {
        Command::Login => {
            let cred = resolver.login().await?;
            let expires_in = cred.expiry_date.saturating_sub(persist::epoch_ms()) / 1000;
            eprintln!("Authorized. Access token valid for {expires_in}s.");
        }
        Command::Token => {
            let token = resolver.access_token().await?;
            println!("{token}");
        }
        Command::Status => {
            let path = resolver.config().credential_path();
            match persist::load(&path) {
                Ok(cred) => {
                    let state = if cred.is_fresh() { "fresh" } else { "stale" };
                    let expires_in = cred.expiry_date.saturating_sub(persist::epoch_ms()) / 1000;
                    let refresh = if cred.refresh_token.is_empty() { "no" } else { "yes" };
                    println!("record:        {}", path.display());
                    println!("access token:  {state} (expires in {expires_in}s)");
                    println!("refresh token: {refresh}");
                }
                Err(_) => {
                    println!("record:        {} (absent)", path.display());
                    println!("run `relay-agent login` to authenticate");
                }
            }
        }
        Command::Get { url } => {
            let api = ApiClient::new(&resolver);
            let body = api.get_json(&url).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}
