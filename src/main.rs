use std::io;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use vconnect_insight::reports::{
    activations_by_branch, average_duration, average_resolution_time, status_tally, timeline,
};
use vconnect_insight::{DataService, ServiceConfig, TimeRange};

#[derive(Parser)]
#[command(
    name = "vconnect-insight",
    version,
    about = "Cached aggregation and reporting over the vconnect incident-code backend"
)]
struct Cli {
    /// Backend API root; overrides VCONNECT_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,
    /// Bearer token; overrides VCONNECT_API_KEY.
    #[arg(long)]
    api_key: Option<String>,
    /// Report window: today, this-week, this-month, this-year or all.
    #[arg(long, default_value = "this-year")]
    range: TimeRange,
    /// Emit CSV instead of a plain table.
    #[arg(long)]
    csv: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Per-code status counters and the most recent records.
    Dashboard,
    /// Activation counts per branch within the active range.
    BranchActivity,
    /// Average resolution time per branch within the active range.
    ResolutionTime,
    /// Time-bucketed activation counts over the active range.
    Timeline,
    /// Cache slot diagnostics as JSON.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ServiceConfig::from_env();
    if let Some(url) = cli.base_url.clone() {
        config.base_url = url;
    }
    if let Some(key) = cli.api_key.clone() {
        config.api_key = Some(key);
    }

    let service = DataService::from_config(&config).context("building data service")?;
    let initialized = service.initialize_all_data(false).await;
    if !initialized {
        warn!("one or more datasets failed to load; output may be incomplete");
    }

    let now = Utc::now();
    match cli.command {
        Command::Dashboard => render_dashboard(&service, cli.csv).await?,
        Command::BranchActivity => render_branch_activity(&service, &cli.range, cli.csv, now).await?,
        Command::ResolutionTime => render_resolution_time(&service, &cli.range, cli.csv, now).await?,
        Command::Timeline => render_timeline(&service, &cli.range, cli.csv, now).await?,
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&service.status())?);
        }
    }

    if !initialized {
        std::process::exit(1);
    }
    Ok(())
}

async fn render_dashboard(service: &DataService, csv: bool) -> anyhow::Result<()> {
    let summary = service.get_dashboard_data(false).await;
    if csv {
        let mut writer = csv::Writer::from_writer(io::stdout());
        writer.write_record(["code_id", "name", "alert", "active", "deactivated", "inactive"])?;
        for row in &summary.by_code {
            writer.write_record([
                row.code_id.as_str(),
                row.name.as_str(),
                row.alert.as_str(),
                &row.active.to_string(),
                &row.deactivated.to_string(),
                &row.inactive.to_string(),
            ])?;
        }
        writer.flush()?;
        return Ok(());
    }

    println!("{:<8} {:<28} {:>7} {:>12} {:>9}", "code", "name", "active", "deactivated", "inactive");
    for row in &summary.by_code {
        println!(
            "{:<8} {:<28} {:>7} {:>12} {:>9}",
            row.code_id, row.name, row.active, row.deactivated, row.inactive
        );
    }
    if !summary.recent.is_empty() {
        println!("\nrecent:");
        for record in &summary.recent {
            let when = record
                .created_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<24} {:<12} {}",
                record.code_name,
                record.status.as_deref().unwrap_or("-"),
                when
            );
        }
    }
    Ok(())
}

async fn render_branch_activity(
    service: &DataService,
    range: &TimeRange,
    csv: bool,
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    let calls = service.get_calls(false).await;
    let bundle = service.get_code_mappings(false).await;
    let branches = service.get_branches(false).await;

    let events = range.filter(&calls, now);
    let rows = activations_by_branch(&events, &bundle.mapped, &branches);
    let tally = status_tally(&events);
    let avg = average_duration(&events);

    if csv {
        let mut writer = csv::Writer::from_writer(io::stdout());
        writer.write_record(["branch_id", "name", "location", "activations"])?;
        for row in &rows {
            writer.write_record([
                row.id.as_str(),
                row.name.as_str(),
                row.location.as_str(),
                &row.count.to_string(),
            ])?;
        }
        writer.flush()?;
        return Ok(());
    }

    println!("{:<10} {:<28} {:<16} {:>11}", "branch", "name", "location", "activations");
    for row in &rows {
        println!(
            "{:<10} {:<28} {:<16} {:>11}",
            row.id, row.name, row.location, row.count
        );
    }
    println!(
        "\n{} events: {} active, {} deactivated, {} inactive ({} unrecognized); avg duration {:.1}s",
        events.len(),
        tally.active,
        tally.deactivated,
        tally.inactive,
        tally.dropped,
        avg
    );
    Ok(())
}

async fn render_resolution_time(
    service: &DataService,
    range: &TimeRange,
    csv: bool,
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    let calls = service.get_calls(false).await;
    let bundle = service.get_code_mappings(false).await;
    let branches = service.get_branches(false).await;

    let mut writer = csv.then(|| csv::Writer::from_writer(io::stdout()));
    if let Some(writer) = writer.as_mut() {
        writer.write_record(["branch_id", "name", "avg_resolution_secs"])?;
    } else {
        println!("{:<10} {:<28} {:>20}", "branch", "name", "avg resolution (s)");
    }

    for branch in &branches {
        let Some(id) = branch.id.as_deref() else {
            continue;
        };
        let avg = average_resolution_time(id, &bundle.mapped, &calls, range, now);
        let name = branch.name.as_deref().unwrap_or("-");
        match writer.as_mut() {
            Some(writer) => {
                writer.write_record([id, name, &format!("{avg:.1}")])?;
            }
            None => println!("{id:<10} {name:<28} {avg:>20.1}"),
        }
    }
    if let Some(writer) = writer.as_mut() {
        writer.flush()?;
    }
    Ok(())
}

async fn render_timeline(
    service: &DataService,
    range: &TimeRange,
    csv: bool,
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    let calls = service.get_calls(false).await;
    let events = range.filter(&calls, now);
    let series = timeline(&events, range);

    if csv {
        let mut writer = csv::Writer::from_writer(io::stdout());
        writer.write_record(["bucket", "count"])?;
        for point in &series {
            writer.write_record([point.label.as_str(), &point.count.to_string()])?;
        }
        writer.flush()?;
        return Ok(());
    }

    for point in &series {
        println!("{:<10} {}", point.label, point.count);
    }
    Ok(())
}
