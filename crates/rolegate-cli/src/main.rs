//! Rolegate CLI: manage permissions, roles and the permission cache.

mod commands;

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use rolegate_authz::{
    AuthzConfig, CacheBackend, MemoryCacheStore, NullCacheStore, RbacService,
};
use rolegate_core::error::RbacResult;
use rolegate_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, Report};

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage rolegate permissions and roles")]
struct Args {
    /// SurrealDB endpoint, e.g. `ws://127.0.0.1:8000` or `mem://`
    #[arg(long, env = "ROLEGATE_DB_ENDPOINT")]
    db_endpoint: Option<String>,

    #[arg(long, env = "ROLEGATE_DB_NAMESPACE")]
    db_namespace: Option<String>,

    #[arg(long, env = "ROLEGATE_DB_DATABASE")]
    db_database: Option<String>,

    #[arg(long, env = "ROLEGATE_DB_USERNAME")]
    db_username: Option<String>,

    #[arg(long, env = "ROLEGATE_DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    /// Where the permission snapshot is cached. The database store is
    /// the one long-running processes read; `memory` lives only as long
    /// as this command.
    #[arg(long, env = "ROLEGATE_CACHE_BACKEND", value_enum, default_value_t = Backend::Database)]
    cache_backend: Backend,

    #[arg(long, env = "ROLEGATE_CACHE_KEY")]
    cache_key: Option<String>,

    /// Guard used when a command does not name one
    #[arg(long, env = "ROLEGATE_DEFAULT_GUARD")]
    default_guard: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Memory,
    Database,
    None,
}

impl From<Backend> for CacheBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Memory => CacheBackend::Memory,
            Backend::Database => CacheBackend::Database,
            Backend::None => CacheBackend::None,
        }
    }
}

impl Args {
    fn db_config(&self) -> DbConfig {
        let mut config = DbConfig::default();
        if let Some(endpoint) = &self.db_endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(namespace) = &self.db_namespace {
            config.namespace = namespace.clone();
        }
        if let Some(database) = &self.db_database {
            config.database = database.clone();
        }
        if config.endpoint.starts_with("mem://") {
            config.credentials = None;
        } else if let Some(credentials) = &mut config.credentials {
            if let Some(username) = &self.db_username {
                credentials.username = username.clone();
            }
            if let Some(password) = &self.db_password {
                credentials.password = password.clone();
            }
        }
        config
    }

    fn authz_config(&self) -> AuthzConfig {
        let mut config = AuthzConfig::default();
        config.cache.backend = self.cache_backend.into();
        if let Some(key) = &self.cache_key {
            config.cache.key = key.clone();
        }
        if let Some(guard) = &self.default_guard {
            config.default_guard = guard.clone();
        }
        config
    }
}

async fn run(args: Args) -> RbacResult<Report> {
    let db = DbManager::open(&args.db_config()).await?;
    let config = args.authz_config();
    execute_on(&db, config, args.command).await
}

async fn execute_on(db: &DbManager, config: AuthzConfig, command: Command) -> RbacResult<Report> {
    let permissions = db.permissions();
    let roles = db.roles();

    match config.cache.backend {
        CacheBackend::Memory => {
            let service = RbacService::new(permissions, roles, MemoryCacheStore::new(), config);
            commands::execute(&service, command).await
        }
        CacheBackend::Database => {
            let service = RbacService::new(permissions, roles, db.cache_store(), config);
            commands::execute(&service, command).await
        }
        CacheBackend::None => {
            let service = RbacService::new(permissions, roles, NullCacheStore, config);
            commands::execute(&service, command).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("rolegate=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(Report::Info(message)) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Ok(Report::Warning(message)) => {
            eprintln!("{message}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
