mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::future::join_all;
use tracing::info;

use driftwatch_client::{DriftClient, FallbackPolicy, FetchOptions, Fetched, Origin};
use driftwatch_core::{config, Config, Mode};

use crate::cli::ProbeArgs;

/// Outcome of one probe check.
struct Check {
    name: String,
    outcome: Result<String, String>,
}

impl Check {
    fn print(&self) {
        match &self.outcome {
            Ok(detail) => println!("ok    {:<18} {}", self.name, detail),
            Err(reason) => println!("FAIL  {:<18} {}", self.name, reason),
        }
    }
}

fn describe<T>(fetched: &Fetched<T>, count: usize, noun: &str) -> String {
    match &fetched.origin {
        Origin::Backend => format!("{count} {noun}"),
        Origin::Synthetic { reason } => format!("{count} sample {noun} ({reason})"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = ProbeArgs::parse();

    let mut config = Config::from_env();
    if let Some(base_url) = args.base_url {
        config.backend.api_base = base_url;
    }
    if let Some(retries) = args.retries {
        config.backend.max_retries = retries;
    }
    config.log_summary();

    let client = DriftClient::from_config(&config)
        .with_context(|| format!("invalid backend URL '{}'", config.backend.api_base))?;

    let checks = run_checks(&client, &args.modes).await;
    for check in &checks {
        check.print();
    }

    let failed = checks.iter().filter(|c| c.outcome.is_err()).count();
    if failed > 0 {
        bail!("{failed} of {} checks failed", checks.len());
    }
    info!(checks = checks.len(), "all checks passed");
    Ok(())
}

async fn run_checks(client: &DriftClient, modes: &[Mode]) -> Vec<Check> {
    // Sample data would hide a broken endpoint.
    let strict = FetchOptions::default().fallback(FallbackPolicy::Surface);

    let mut checks = vec![Check {
        name: "health".to_string(),
        outcome: if client.check_health().await {
            Ok(client.base_url().to_string())
        } else {
            Err(format!("{} is not healthy", client.base_url()))
        },
    }];

    let kpi_checks = join_all(modes.iter().map(|&mode| async move {
        Check {
            name: format!("kpis {mode}"),
            outcome: client
                .fetch_kpis_with(mode, None, strict)
                .await
                .map(|f| describe(&f, f.data.len(), "KPIs"))
                .map_err(|e| e.to_string()),
        }
    }))
    .await;
    checks.extend(kpi_checks);

    checks.push(Check {
        name: "errors".to_string(),
        outcome: client
            .fetch_errors_with(strict)
            .await
            .map(|f| describe(&f, f.data.table_data.len(), "error rows"))
            .map_err(|e| e.to_string()),
    });

    checks.push(Check {
        name: "business units".to_string(),
        outcome: client
            .fetch_business_units()
            .await
            .map(|units| units.join(", "))
            .map_err(|e| e.to_string()),
    });

    checks
}
