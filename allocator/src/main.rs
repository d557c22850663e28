//! Review allocator operator binary
//!
//! Wires the PostgreSQL adapters into the allocation services and runs one
//! command per invocation, printing results as JSON.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm::Database;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use review_allocator::adapters::{
    PostgresAssignmentRepository, PostgresPeerEvaluationRepository, PostgresPreferenceRepository,
    PostgresProposalRepository, PostgresReviewRepository, PostgresReviewerRepository,
};
use review_allocator::app::{
    BulkAssignmentService, ConfidenceService, IndividualAssignmentService, IndividualOptions,
    PeerPanelService, PeerRequestOptions,
};
use review_allocator::config::Config;
use review_allocator::domain::entities::{FundId, ProposalId, ReviewId, ReviewerId};

#[derive(Parser)]
#[command(name = "review-allocator", version, about = "Allocate proposal reviewers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a bulk assignment pass over one or more funds
    Bulk {
        #[arg(required = true)]
        fund_ids: Vec<Uuid>,
        /// Shuffle seed; random when omitted and logged for replay
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Assign more proposals to a single reviewer
    Individual {
        fund_id: Uuid,
        reviewer_id: Uuid,
        /// Assign at most this many
        #[arg(long)]
        count: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Assemble a peer panel for a submitted review
    Panel { review_id: Uuid },
    /// Assemble panels for every submitted review of a fund that lacks one
    Panels { fund_id: Uuid },
    /// Assign more peer evaluations to a single evaluator
    PeerRequest {
        fund_id: Uuid,
        evaluator_id: Uuid,
        /// Assign at most this many
        #[arg(long)]
        count: Option<u32>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Compute review confidence for a proposal
    Confidence { proposal_id: Uuid },
}

type Bulk = BulkAssignmentService<
    PostgresReviewerRepository,
    PostgresProposalRepository,
    PostgresPreferenceRepository,
    PostgresAssignmentRepository,
>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,review_allocator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let settings = config.settings();

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Create adapters
    let reviewer_repo = Arc::new(PostgresReviewerRepository::new(db.clone()));
    let proposal_repo = Arc::new(PostgresProposalRepository::new(db.clone()));
    let preference_repo = Arc::new(PostgresPreferenceRepository::new(db.clone()));
    let assignment_repo = Arc::new(PostgresAssignmentRepository::new(db.clone()));
    let review_repo = Arc::new(PostgresReviewRepository::new(db.clone()));
    let evaluation_repo = Arc::new(PostgresPeerEvaluationRepository::new(db));

    match cli.command {
        Command::Bulk {
            fund_ids,
            seed,
            dry_run,
        } => {
            let service = Arc::new(BulkAssignmentService::new(
                reviewer_repo,
                proposal_repo,
                preference_repo,
                assignment_repo,
                settings,
            ));
            run_bulk(service, fund_ids, seed, dry_run).await?;
        }
        Command::Individual {
            fund_id,
            reviewer_id,
            count,
            seed,
            dry_run,
        } => {
            let service = IndividualAssignmentService::new(
                reviewer_repo,
                proposal_repo,
                preference_repo,
                assignment_repo,
                settings,
            );
            let options = IndividualOptions {
                requested: count,
                seed,
                dry_run,
            };
            let assignments = service
                .request_for(&ReviewerId(reviewer_id), &FundId(fund_id), options)
                .await?;
            print_json(&assignments)?;
        }
        Command::Panel { review_id } => {
            let service = PeerPanelService::new(
                reviewer_repo,
                proposal_repo,
                review_repo,
                assignment_repo,
                evaluation_repo,
                settings,
            );
            let panel = service.assemble_for_review(&ReviewId(review_id)).await?;
            print_json(&panel)?;
        }
        Command::Panels { fund_id } => {
            let service = PeerPanelService::new(
                reviewer_repo,
                proposal_repo,
                review_repo,
                assignment_repo,
                evaluation_repo,
                settings,
            );
            let report = service.assemble_pending(&FundId(fund_id)).await?;
            print_json(&report)?;
        }
        Command::PeerRequest {
            fund_id,
            evaluator_id,
            count,
            dry_run,
        } => {
            let service = PeerPanelService::new(
                reviewer_repo,
                proposal_repo,
                review_repo,
                assignment_repo,
                evaluation_repo,
                settings,
            );
            let options = PeerRequestOptions {
                requested: count,
                dry_run,
            };
            let evaluations = service
                .request_evaluations(&ReviewerId(evaluator_id), &FundId(fund_id), options)
                .await?;
            print_json(&evaluations)?;
        }
        Command::Confidence { proposal_id } => {
            let service = ConfidenceService::new(proposal_repo, review_repo, reviewer_repo);
            let breakdown = service.for_proposal(&ProposalId(proposal_id)).await?;
            print_json(&breakdown)?;
        }
    }

    Ok(())
}

/// Run one pass per fund concurrently; Ctrl-C stops each pass between reviewers
async fn run_bulk(
    service: Arc<Bulk>,
    fund_ids: Vec<Uuid>,
    seed: Option<u64>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    tracing::info!(seed, dry_run, funds = fund_ids.len(), "Starting bulk assignment");

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current reviewer");
            watcher.cancel();
        }
    });

    let mut tasks = JoinSet::new();
    for fund_id in fund_ids {
        let service = service.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let fund_id = FundId(fund_id);
            (fund_id, service.run_fund(fund_id, seed, dry_run, &cancel).await)
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (fund_id, result) = joined.context("Bulk assignment task panicked")?;
        match result {
            Ok(outcome) => print_json(&outcome.report)?,
            Err(e) => {
                tracing::error!(fund_id = %fund_id, error = %e, "Bulk assignment failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} fund(s) failed to load", failed);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
