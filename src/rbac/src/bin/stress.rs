//! RBAC Stress Driver
//!
//! Hammers one synced enforcer from many worker threads and checks that the
//! final model is what a sequential run would have produced:
//! - racing identical grants yield exactly one affected call
//! - paired grant/revoke per worker leaves no residue
//! - readers never observe a half-applied batch grant

use anyhow::{bail, Context, Result};
use clap::Parser;
use cretoai_rbac::{EnforcerConfig, SyncedEnforcer};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Concurrent workload against a synced RBAC enforcer
#[derive(Parser)]
#[command(name = "rbac-stress")]
#[command(about = "Concurrent workload driver for the synced RBAC enforcer")]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, env = "RBAC_CONFIG")]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long, default_value_t = 8)]
    threads: usize,

    /// Operations per worker
    #[arg(short, long, default_value_t = 1000)]
    iterations: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print Prometheus metrics when done
    #[arg(long)]
    metrics: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},cretoai_rbac=warn", log_level).into()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = match &cli.config {
        Some(path) => EnforcerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EnforcerConfig::default(),
    };

    if config.model.domains || !config.model.role_definition {
        bail!("rbac-stress needs a role model without domains");
    }
    if config.model.permission_fields.len() != 2 {
        bail!("rbac-stress needs exactly two permission fields (object, action)");
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build()
        .context("Failed to build worker pool")?;

    let enforcer = SyncedEnforcer::from_config(&config).context("Failed to build enforcer")?;
    let start = Instant::now();

    pool.install(|| -> Result<()> {
        racing_grants(&enforcer, cli.threads * 4)?;
        grant_revoke_cycles(&enforcer, cli.threads, cli.iterations)?;
        batch_visibility(&enforcer, cli.threads, cli.iterations)?;
        Ok(())
    })?;

    info!("All invariants held in {:?}", start.elapsed());

    if cli.metrics {
        if let Some(metrics) = enforcer.metrics() {
            print!("{}", metrics.gather_text().context("Failed to render metrics")?);
        }
    }

    Ok(())
}

/// Many callers add the same permission; exactly one may be affected
fn racing_grants(enforcer: &SyncedEnforcer, callers: usize) -> Result<()> {
    let affected = AtomicUsize::new(0);

    (0..callers).into_par_iter().try_for_each(|_| -> Result<()> {
        if enforcer.add_permission_for_user("bob", &["data1", "read"])? {
            affected.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    })?;

    let affected = affected.load(Ordering::Relaxed);
    let rules = enforcer.get_permissions_for_user("bob", None)?;
    info!(callers, affected, rules = rules.len(), "racing grants finished");

    if affected != 1 || rules.len() != 1 {
        bail!("expected one affected grant and one rule, got {} and {}", affected, rules.len());
    }
    Ok(())
}

/// Every worker grants then revokes its own role; nothing should remain
fn grant_revoke_cycles(enforcer: &SyncedEnforcer, workers: usize, iterations: usize) -> Result<()> {
    (0..workers).into_par_iter().try_for_each(|worker| -> Result<()> {
        let user = format!("user-{}", worker);
        for i in 0..iterations {
            let role = format!("role-{}", i % 16);
            let added = enforcer.add_role_for_user(&user, &role, None)?;
            let removed = enforcer.delete_role_for_user(&user, &role, None)?;
            if !added || !removed {
                bail!("{} lost a grant/revoke pair on {}: ({}, {})", user, role, added, removed);
            }
        }
        debug!(worker, iterations, "grant/revoke worker finished");
        Ok(())
    })?;

    for worker in 0..workers {
        let user = format!("user-{}", worker);
        let roles = enforcer.get_roles_for_user(&user, None)?;
        if !roles.is_empty() {
            bail!("{} still holds roles {:?}", user, roles);
        }
    }

    info!(workers, iterations, "grant/revoke cycles finished");
    Ok(())
}

/// A batch grant is observed by readers either fully or not at all
fn batch_visibility(enforcer: &SyncedEnforcer, workers: usize, iterations: usize) -> Result<()> {
    const BATCH: [&str; 3] = ["auditor", "reviewer", "approver"];
    let partial = AtomicUsize::new(0);

    (0..workers.max(2)).into_par_iter().try_for_each(|worker| -> Result<()> {
        for _ in 0..iterations {
            if worker == 0 {
                enforcer.add_roles_for_user("carol", &BATCH, None)?;
                enforcer.delete_roles_for_user("carol", None)?;
            } else {
                let held = match enforcer.get_roles_for_user("carol", None) {
                    Ok(roles) => roles.len(),
                    Err(_) => 0,
                };
                if held != 0 && held != BATCH.len() {
                    partial.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Ok(())
    })?;

    let partial = partial.load(Ordering::Relaxed);
    info!(partial, "batch visibility finished");

    if partial != 0 {
        bail!("readers observed {} partially applied batch grants", partial);
    }
    Ok(())
}
