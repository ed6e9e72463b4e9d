//! Tally balance reconciler.
//!
//! Recomputes `remaining_amount` for selected projects, or for every project
//! page by page. Used after bulk imports and to repair drift.
//!
//! Usage:
//!   reconciler all                  - Reconcile every project
//!   reconciler projects <ID>...     - Reconcile the given projects

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_core::balance::Reconciliation;
use tally_db::repositories::{ProjectError, ProjectRepository};
use tally_shared::AppConfig;
use tally_shared::types::ProjectId;

#[derive(Debug, Parser)]
#[command(name = "reconciler")]
#[command(version, about = "Recompute stored project balances", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Projects fetched per page (overrides `reconcile.batch_size`)
    #[arg(long, global = true)]
    batch_size: Option<u64>,

    /// Re-attempts after a concurrent modification (overrides `reconcile.conflict_retries`)
    #[arg(long, global = true)]
    retries: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile every project
    All,
    /// Reconcile the given projects
    Projects {
        /// Project IDs
        #[arg(required = true)]
        ids: Vec<ProjectId>,
    },
}

/// Counts of one run.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    reconciled: usize,
    overpaid: usize,
    failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: &Result<Reconciliation, ProjectError>) {
        match outcome {
            Ok(reconciliation) => {
                self.reconciled += 1;
                if reconciliation.breakdown.is_overpaid() {
                    self.overpaid += 1;
                }
            }
            Err(_) => self.failed += 1,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=info,reconciler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let batch_size = cli.batch_size.unwrap_or(config.reconcile.batch_size).max(1);
    let retries = cli.retries.unwrap_or(config.reconcile.conflict_retries);

    let db = tally_db::connect(&config.database).await?;
    info!("Connected to database");

    let repo = ProjectRepository::new(db);
    let mut summary = Summary::default();

    match cli.command {
        Command::Projects { ids } => {
            for id in ids {
                let outcome = reconcile_with_retries(&repo, id, retries).await;
                summary.record(&outcome);
            }
        }
        Command::All => {
            let mut after = None;
            loop {
                let page = repo.list_ids(after, batch_size).await?;
                let Some(last) = page.last().copied() else {
                    break;
                };
                for id in page {
                    let outcome = reconcile_with_retries(&repo, id, retries).await;
                    summary.record(&outcome);
                }
                after = Some(last);
            }
        }
    }

    info!(
        reconciled = summary.reconciled,
        overpaid = summary.overpaid,
        failed = summary.failed,
        "Reconciliation run finished"
    );

    if summary.failed > 0 {
        bail!("{} project(s) failed to reconcile", summary.failed);
    }
    Ok(())
}

/// Reconciles one project, re-running it when its version moved underneath.
async fn reconcile_with_retries(
    repo: &ProjectRepository,
    id: ProjectId,
    retries: u32,
) -> Result<Reconciliation, ProjectError> {
    let mut attempt = 0;
    loop {
        match repo.reconcile(id).await {
            Err(err) if err.is_retryable() && attempt < retries => {
                attempt += 1;
                warn!(project_id = %id, attempt, "Project changed during reconciliation, retrying");
            }
            Err(err) => {
                error!(project_id = %id, error = %err, "Reconciliation failed");
                return Err(err);
            }
            ok => return ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tally_core::balance::{BalanceBreakdown, BalanceError};

    fn reconciliation(remaining: i64) -> Reconciliation {
        Reconciliation {
            project_id: ProjectId::new(),
            breakdown: BalanceBreakdown {
                budget: 0.into(),
                total_additions: 0.into(),
                total_paid: 0.into(),
                remaining: remaining.into(),
            },
            version: 1,
        }
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_project_ids() {
        let id = ProjectId::new();
        let cli = Cli::try_parse_from(["reconciler", "projects", &id.to_string(), "--retries", "0"])
            .unwrap();

        assert_eq!(cli.retries, Some(0));
        match cli.command {
            Command::Projects { ids } => assert_eq!(ids, vec![id]),
            Command::All => panic!("expected projects"),
        }
    }

    #[test]
    fn test_projects_requires_ids() {
        assert!(Cli::try_parse_from(["reconciler", "projects"]).is_err());
        assert!(Cli::try_parse_from(["reconciler", "projects", "not-a-uuid"]).is_err());
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = Summary::default();
        summary.record(&Ok(reconciliation(400)));
        summary.record(&Ok(reconciliation(-100)));
        summary.record(&Err(ProjectError::Balance(BalanceError::ProjectNotFound(
            ProjectId::new(),
        ))));

        assert_eq!(
            summary,
            Summary {
                reconciled: 2,
                overpaid: 1,
                failed: 1,
            }
        );
    }
}
