//! Domains command: list known mirrors and their health statistics.

use anyhow::Result;
use tracing::info;

use paperdl_core::{Database, MirrorStore};

use crate::cli::DomainsArgs;

/// Prints all persisted mirrors sorted by success count, best first.
pub async fn run_domains_command(args: &DomainsArgs, db: Database) -> Result<()> {
    let store = MirrorStore::new(db);
    let mut mirrors = store.get_all().await?;

    if mirrors.is_empty() && !args.json {
        info!("no mirrors recorded yet; run the domain refresh job to seed them");
        return Ok(());
    }

    mirrors.sort_by(|a, b| b.success_times.cmp(&a.success_times));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mirrors)?);
        return Ok(());
    }

    println!("{:<48} {:>13} {:>12}", "Url", "SuccessTimes", "FailedTimes");
    for mirror in &mirrors {
        println!(
            "{:<48} {:>13} {:>12}",
            mirror.url, mirror.success_times, mirror.failed_times
        );
    }

    Ok(())
}
