//! CLI for member enrollment and spouse linking
//!
//! Every command prints a single JSON object on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loyalty_core::config::Config;
use loyalty_core::domains::member::edges;
use loyalty_core::domains::member::models::FamilyMember;
use loyalty_core::domains::member::{EnrollmentRequest, MemberData, MemberError};
use loyalty_core::kernel::{NatsClientPublisher, PgIdentityStore, ServerDeps, SystemClock};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "member_cli")]
#[command(about = "Loyalty member enrollment CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a new member
    Enroll {
        external_id: String,
        #[arg(long)]
        partner: String,
        #[arg(long)]
        client_type: String,
        #[arg(long)]
        family_id: Option<String>,
        /// External id of the spouse to link with
        #[arg(long)]
        spouse: Option<String>,
    },

    /// Show a member
    Get { external_id: String },

    /// Re-run spouse linking for a member
    Relink {
        external_id: String,
        /// Overrides the spouse reference stored at enrollment
        #[arg(long)]
        spouse: Option<String>,
    },

    /// List the relationship records of a family
    Family { family_id: String },
}

// ============================================================================
// JSON Response Types
// ============================================================================

#[derive(Serialize)]
struct Response {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    member: Option<MemberData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    family: Option<Vec<FamilyMember>>,
}

impl Response {
    fn member(member: MemberData) -> Self {
        Self {
            success: true,
            error: None,
            member: Some(member),
            family: None,
        }
    }

    fn family(family: Vec<FamilyMember>) -> Self {
        Self {
            success: true,
            error: None,
            member: None,
            family: Some(family),
        }
    }

    fn failure(err: &MemberError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            member: None,
            family: None,
        }
    }
}

fn output(resp: &Response) -> Result<()> {
    println!("{}", serde_json::to_string(resp)?);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,loyalty_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let deps = build_deps(&config).await?;

    let response = match cli.command {
        Commands::Enroll {
            external_id,
            partner,
            client_type,
            family_id,
            spouse,
        } => {
            let request = EnrollmentRequest {
                external_id,
                partner,
                client_type,
                family_id,
                spouse_external_id: spouse,
            };
            edges::enroll(request, &deps).await.map(Response::member)
        }
        Commands::Get { external_id } => edges::get_by_external_id(&external_id, &deps)
            .await
            .map(Response::member),
        Commands::Relink {
            external_id,
            spouse,
        } => edges::relink_spouse(&external_id, spouse.as_deref(), &deps)
            .await
            .map(Response::member),
        Commands::Family { family_id } => edges::family(&family_id, &deps)
            .await
            .map(Response::family),
    };

    match response {
        Ok(resp) => output(&resp),
        Err(err) => {
            output(&Response::failure(&err))?;
            std::process::exit(1);
        }
    }
}

async fn build_deps(config: &Config) -> Result<ServerDeps> {
    tracing::debug!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let publisher = NatsClientPublisher::connect(&config.nats_url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats_url))?;

    Ok(ServerDeps::new(
        Arc::new(PgIdentityStore::new(pool)),
        Arc::new(publisher),
        Arc::new(SystemClock),
        config.nats_subject_prefix.clone(),
    ))
}
