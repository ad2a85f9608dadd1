//! CLI smoke entry point.
//!
//! # Responsibility
//! - Bootstrap config, logging and storage the way a server process would.
//! - Print the registered entity scopes for quick local sanity checks.

use backstage_core::{init_from_config, open_db, AppConfig, RepositoryRegistry, TrashFilter};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("backstage: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_from_config(&config)?;

    let conn = open_db(&config.db_path)?;
    let registry = RepositoryRegistry::with_defaults()?;
    for kind in registry.kinds() {
        let repo = registry.repository(kind, &conn)?;
        let descriptor = repo.descriptor();
        let order = descriptor
            .order
            .map(|order| format!("{} {}", order.field, order.direction.as_sql()))
            .unwrap_or_else(|| "none".to_string());
        println!(
            "entity={kind} alias={} joins=[{}] order={order} tree={} live={}",
            descriptor.alias,
            descriptor.joins.join(","),
            descriptor.is_tree(),
            repo.count(TrashFilter::Exclude)?
        );
    }
    Ok(())
}
