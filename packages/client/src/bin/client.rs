//! Terminal client for the space session server.
//!
//! Joins a space and walks around it with w/a/s/d or `move X Y`, printing
//! what everyone else in the space does.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client -- --space-id s1 --token <JWT>
//! HIROBA_JWT_SECRET=dev-secret cargo run --bin hiroba-client -- --space-id s1 --mint alice
//! ```

use clap::Parser;
use hiroba_client::{ClientError, run_client_session};
use hiroba_server::{domain::UserId, infrastructure::auth::issue_token};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "Walk around a shared space from the terminal", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Space to join
    #[arg(short = 's', long)]
    space_id: String,

    /// Join token issued by the account service
    #[arg(short = 't', long, conflicts_with = "mint", required_unless_present = "mint")]
    token: Option<String>,

    /// Mint a token for this user id locally (development only, needs the server's secret)
    #[arg(long)]
    mint: Option<String>,

    /// HMAC secret for --mint
    #[arg(long, env = "HIROBA_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

fn resolve_token(args: &Args) -> Result<(String, String), String> {
    match (&args.token, &args.mint) {
        (Some(token), _) => Ok((token.clone(), "me".to_string())),
        (None, Some(user)) => {
            let secret = args
                .jwt_secret
                .as_deref()
                .ok_or("--mint needs --jwt-secret or HIROBA_JWT_SECRET")?;
            let user_id = UserId::new(user.clone()).map_err(|e| e.to_string())?;
            let token = issue_token(secret.as_bytes(), &user_id, None, None)
                .map_err(|e| e.to_string())?;
            Ok((token, user.clone()))
        }
        (None, None) => Err("either --token or --mint is required".to_string()),
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let (token, label) = match resolve_token(&args) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    match run_client_session(&args.url, &args.space_id, &token, &label).await {
        Ok(()) => tracing::info!("Left space '{}'", args.space_id),
        Err(e @ ClientError::AuthenticationFailed) => {
            tracing::error!("{}: check the token", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Client error: {}", e);
            std::process::exit(1);
        }
    }
}
