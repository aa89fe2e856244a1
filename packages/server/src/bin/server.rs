//! Real-time space session server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server -- --jwt-secret dev-secret --spaces-file spaces.json
//! HIROBA_JWT_SECRET=dev-secret HIROBA_SPACES_FILE=spaces.json cargo run --bin hiroba-server -- --port 3000
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use hiroba_server::{
    config::ServerConfig,
    infrastructure::{
        auth::JwtTokenAuthenticator, repository::InMemorySpaceRepository, room::RoomRegistry,
    },
    ui::Server,
    usecase::{GetSpaceDetailUseCase, GetSpacesUseCase, JoinSpaceUseCase},
};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Real-time space session server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HIROBA_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "HIROBA_PORT", default_value = "8080")]
    port: u16,

    /// HMAC secret used to verify HS256 join tokens
    #[arg(long, env = "HIROBA_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// JSON catalog of spaces and their static elements
    #[arg(long, env = "HIROBA_SPACES_FILE")]
    spaces_file: String,

    /// Seconds a new connection may take to send its join frame
    #[arg(long, default_value = "10")]
    handshake_timeout_secs: u64,

    /// Per-connection outbound queue bound
    #[arg(long, default_value = "256")]
    outbound_queue_capacity: usize,

    /// Per-room mailbox bound
    #[arg(long, default_value = "1024")]
    room_queue_capacity: usize,

    /// Malformed frames tolerated before a connection is closed
    #[arg(long, default_value = "32")]
    max_malformed_frames: usize,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            handshake_timeout: Duration::from_secs(args.handshake_timeout_secs),
            outbound_queue_capacity: args.outbound_queue_capacity.max(1),
            room_queue_capacity: args.room_queue_capacity.max(1),
            max_malformed_frames: args.max_malformed_frames,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let config = ServerConfig::from(&args);

    // 1. Repository（空間カタログ）
    let repository = match InMemorySpaceRepository::from_file(&args.spaces_file) {
        Ok(repository) => repository,
        Err(e) => {
            tracing::error!("Failed to load space catalog: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Loaded {} space(s) from {}",
        repository.len(),
        args.spaces_file
    );

    // 2. Authenticator / RoomRegistry
    let authenticator = Arc::new(JwtTokenAuthenticator::new(args.jwt_secret.as_bytes()));
    let registry = Arc::new(RoomRegistry::new(
        Arc::new(repository),
        config.room_queue_capacity,
    ));

    // 3. UseCases
    let join_space_usecase = Arc::new(JoinSpaceUseCase::new(authenticator, registry.clone()));
    let get_spaces_usecase = Arc::new(GetSpacesUseCase::new(registry.clone()));
    let get_space_detail_usecase = Arc::new(GetSpaceDetailUseCase::new(registry));

    // 4. Server
    let server = Server::new(
        join_space_usecase,
        get_spaces_usecase,
        get_space_detail_usecase,
        config,
    );
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
