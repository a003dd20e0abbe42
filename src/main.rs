use crate::config::AppConfig;
use crate::db::connection::now_millis;
use crate::db::{init_db, Database};
use crate::errors::ServerError;
use crate::router::handle;
use astra::Server;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod db;
mod domain;
mod errors;
mod responses;
mod router;
mod spreadsheets;

#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(author, version, about = "Dealership scan log server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Register a consultant and print its id
    AddConsultant {
        name: String,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Issue a session token for a consultant and print it
    IssueSession { consultant_id: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "fatal");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ServerError> {
    let cfg = AppConfig::from_env()?;

    let db = Database::new(cfg.db_path.clone());
    init_db(&db)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cfg, db),
        Command::AddConsultant { name, avatar_url } => {
            let id = db.with_conn(|conn| {
                db::consultants::create_consultant(conn, &name, avatar_url.as_deref(), now_millis())
            })?;
            tracing::info!(%id, %name, "consultant registered");
            println!("{id}");
            Ok(())
        }
        Command::IssueSession { consultant_id } => {
            let token = db.with_conn(|conn| {
                if db::consultants::get_consultant(conn, &consultant_id)?.is_none() {
                    return Err(ServerError::BadRequest(format!(
                        "unknown consultant '{consultant_id}'"
                    )));
                }
                auth::create_session(conn, &consultant_id, now_millis(), cfg.session_ttl)
            })?;
            println!("{token}");
            Ok(())
        }
    }
}

fn serve(cfg: &AppConfig, db: Database) -> Result<(), ServerError> {
    tracing::info!(addr = %cfg.bind_addr, workers = cfg.max_workers, "starting server");

    let server = Server::bind(&cfg.bind_addr).max_workers(cfg.max_workers);

    server
        .serve(move |req, _info| match handle(req, &db) {
            Ok(resp) => resp,
            Err(err) => responses::error_to_response(err),
        })
        .map_err(|e| {
            tracing::error!(error = %e, "server ended with error");
            ServerError::InternalError
        })?;

    tracing::info!("server shut down cleanly");
    Ok(())
}
