mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;
use staking_nft::{
    ACCUMULATOR_MODULUS, FRACTION_RESERVED, MAGIC_VALUE, MAX_GOVERNANCE_LOCK, MAX_MINT_LOCK,
    MAX_SHARES, SCALE, SLUSH_MAX,
};
use tracing_subscriber::EnvFilter;

use scenario::Report;

// ─── Version banner ───────────────────────────────────────────────────────────

/// Print the staking-sim banner to stdout.
fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  staking-sim  v{ver}  ·  accumulator staking engine simulator");
    println!("  {}", "─".repeat(62));
    println!("  Engine    two-resource pro-rata rewards, O(1) per operation");
    println!("  Lockup    80/20 profit split, reward pool, bonus pool");
    println!("  Input     JSON scenarios (see docs/scenarios/)");
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// staking-sim: run staking and lockup scenarios against the reward engine.
///
/// Every command supports --json for machine-readable output.
/// Logging goes to stderr and can also be set via environment variable:
///   STAKING_LOG  tracing filter, e.g. `info` or `staking_nft=debug`
#[derive(Parser)]
#[command(
    name        = "staking-sim",
    version     = env!("CARGO_PKG_VERSION"),
    about       = "Accumulator-based staking engine simulator: positions, profits, lockups.",
    after_help  = "\
ENVIRONMENT:
  STAKING_LOG    tracing filter for stderr logs  [default: warn]

QUICK START:
  staking-sim run docs/scenarios/proportional.json
  staking-sim run docs/scenarios/lockup.json --json
  staking-sim constants

SCENARIOS:
  A scenario lists actors' starting balances, an optional lockup and the
  steps to run. Amounts are decimal strings (\"1000\", \"25519e21\")."
)]
struct Cli {
    /// Log filter for stderr output (tracing env-filter syntax)
    #[arg(
        long,
        global     = true,
        value_name = "FILTER",
        default_value = "warn",
        env = "STAKING_LOG"
    )]
    log_level: String,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file and print every step and the final state
    ///
    /// Steps run in order at their `at` heights. Any rejection not listed
    /// in the step's `expect_error` aborts the run with a non-zero exit.
    #[command(
        after_help = "\
EXAMPLES:
  staking-sim run docs/scenarios/slush.json
  staking-sim run docs/scenarios/lockup.json --json
  STAKING_LOG=info staking-sim run my-scenario.json"
    )]
    Run {
        /// Path to the scenario JSON file
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Print the engine's fixed constants
    #[command(
        after_help = "\
EXAMPLES:
  staking-sim constants
  staking-sim constants --json"
    )]
    Constants,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    // When invoked with no arguments, show banner + full help and exit cleanly.
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).context("Invalid --log-level filter")?)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Run { path } => cmd_run(path, cli.json)?,
        Commands::Constants => cmd_constants(cli.json),
    }

    Ok(())
}

// ─── run ──────────────────────────────────────────────────────────────────────

fn cmd_run(path: &Path, json_output: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read scenario '{}'", path.display()))?;
    let scenario = scenario::load(&text).with_context(|| format!("In '{}'", path.display()))?;
    let report = scenario::run(&scenario)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &Report) {
    let title = if report.name.is_empty() { "scenario" } else { &report.name };
    println!("─── Scenario: {title} ──────────────────────────────────────────────");
    if !report.description.is_empty() {
        println!("  {}", report.description);
        println!();
    }
    for step in &report.steps {
        let status = if step.ok { "ok " } else { "err" };
        let detail = match &step.error {
            Some(e) => format!("(expected) {e}"),
            None if step.value.is_null() => String::new(),
            None => step.value.to_string(),
        };
        println!("  #{:<3} h{:<8} {status}  {:<22} {detail}", step.index, step.height, step.op);
        for t in &step.transfers {
            println!("         {:>6}  {} → {}  {}", t.resource, t.from, t.to, t.amount);
        }
    }

    println!();
    println!("─── Balances at h{} ─────────────────────────────────────────────", report.final_height);
    for b in &report.balances {
        if b.native == "0" && b.token == "0" {
            continue;
        }
        println!("  {:<16} native {:>24}   token {:>24}", b.account, b.native, b.token);
    }

    println!();
    println!("─── Pools ──────────────────────────────────────────────────────────");
    for pool in &report.pools {
        println!(
            "  {:<8} reserve {:>24}   accumulator {}   slush {}",
            pool.resource, pool.reserve, pool.accumulator, pool.slush
        );
    }

    if !report.positions.is_empty() {
        println!();
        println!("─── Open positions ─────────────────────────────────────────────────");
        for p in &report.positions {
            println!(
                "  #{:<4} shares {:>20}  pending native {:>16}  token {:>16}{}",
                p.token_id,
                p.shares,
                p.pending_native,
                p.pending_token,
                if p.locked { "  [locked]" } else { "" }
            );
        }
    }

    if let Some(lockup) = &report.lockup {
        println!();
        println!("─── Lockup ─────────────────────────────────────────────────────────");
        println!("  State            {:?}  (blocks {}–{})", lockup.state, lockup.start_block, lockup.end_block);
        println!("  Positions        {}", lockup.locked_positions);
        println!("  Shares locked    {}  of {} original", lockup.total_shares_locked, lockup.original_shares_locked);
        println!("  Payout safe      {}", lockup.payout_safe);
        println!("  Reward pool      native {}  token {}", lockup.reward_pool_native, lockup.reward_pool_token);
    }
}

// ─── constants ────────────────────────────────────────────────────────────────

fn cmd_constants(json_output: bool) {
    if json_output {
        println!("{}", json!({
            "status":              "ok",
            "command":             "constants",
            "scale":               SCALE.to_string(),
            "accumulator_modulus": ACCUMULATOR_MODULUS.to_string(),
            "slush_max":           SLUSH_MAX.to_string(),
            "max_shares":          MAX_SHARES.to_string(),
            "fraction_reserved":   FRACTION_RESERVED.to_string(),
            "magic":               MAGIC_VALUE,
            "max_mint_lock":       MAX_MINT_LOCK,
            "max_governance_lock": MAX_GOVERNANCE_LOCK,
        }));
    } else {
        println!("─── Engine constants ───────────────────────────────────────────────");
        println!("  Scale                {SCALE}");
        println!("  Accumulator modulus  {ACCUMULATOR_MODULUS}  (2^168)");
        println!("  Slush max            {SLUSH_MAX}  (2^167)");
        println!("  Max shares           {MAX_SHARES}  (2^224)");
        println!("  Reserved fraction    {FRACTION_RESERVED}  (20%)");
        println!("  Deposit magic        {MAGIC_VALUE}");
        println!("  Max mint lock        {MAX_MINT_LOCK} blocks");
        println!("  Max governance lock  {MAX_GOVERNANCE_LOCK} blocks");
    }
}
