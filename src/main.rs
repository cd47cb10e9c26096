use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use finance_ledger::config::ClientConfig;
use finance_ledger::credentials::EnvToken;
use finance_ledger::export::{export_file_name, write_export};
use finance_ledger::filter::FilterCriteria;
use finance_ledger::http_backend::HttpBackend;
use finance_ledger::TransactionViewModel;

/// Query and export the finance transaction ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of the finance API. Overrides FINANCE_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Case-insensitive search over student name, registration number,
    /// transaction id and receipt number.
    #[arg(short, long, default_value = "")]
    search: String,

    /// Status to show: pending, completed, failed, cancelled or all.
    #[arg(long, default_value = "all")]
    status: String,

    /// Payment type to show (e.g. academic, hostel) or all.
    #[arg(long, default_value = "all")]
    payment_type: String,

    /// First submission day to include (YYYY-MM-DD). Needs --to.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last submission day to include (YYYY-MM-DD). Needs --from.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Page of results to print.
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Results per page.
    #[arg(long, default_value_t = 20)]
    page_size: usize,

    /// Write the filtered ledger as CSV. Pass a directory to use the
    /// default dated file name, or `-` for stdout.
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Also fetch and print the server's aggregate stats.
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let args = Args::parse();

    let mut config = ClientConfig::from_env().context("Failed to read API configuration")?;
    if let Some(url) = &args.api_url {
        config = config
            .with_base_url(url.as_str())
            .context("Invalid --api-url")?;
    }

    let criteria = build_criteria(&args)?;

    let credentials = Arc::new(EnvToken::new(config.token_var.clone()));
    let backend = HttpBackend::new(&config, credentials).context("Failed to set up API client")?;
    let ledger = TransactionViewModel::new(backend);

    ledger
        .load()
        .await
        .with_context(|| format!("Failed to load transactions from {}", config.base_url))?;

    let page = ledger.visible_page(&criteria, args.page, args.page_size).await;
    for tx in &page.items {
        let student = tx
            .student
            .as_ref()
            .and_then(|s| s.full_name())
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "{}  {:<10} {:>12}  {:<12} {:<10} {}",
            tx.submitted_date.format("%Y-%m-%d"),
            tx.status,
            tx.amount,
            tx.payment_mode(),
            tx.payment_type,
            student
        );
    }
    println!(
        "page {}/{} ({} matching)",
        page.page, page.total_pages, page.total_items
    );

    let summary = ledger.summary(&criteria).await;
    println!("total: {} across {} transactions", summary.overall.amount, summary.overall.count);
    for (status, totals) in &summary.by_status {
        println!("  {:<10} {:>5}  {}", status, totals.count, totals.amount);
    }

    if args.stats {
        let stats = ledger.stats().await.context("Failed to fetch stats")?;
        for (key, value) in stats.iter() {
            println!("{}: {}", key, value);
        }
    }

    if let Some(target) = &args.export {
        let rows = ledger.export(&criteria).await;
        if target.as_os_str() == "-" {
            write_export(&rows, io::stdout()).context("Failed to write export")?;
        } else {
            let path = if target.is_dir() {
                target.join(export_file_name(Utc::now().date_naive()))
            } else {
                target.clone()
            };
            let file = File::create(&path)
                .with_context(|| format!("Failed to create export file '{}'", path.display()))?;
            write_export(&rows, file).context("Failed to write export")?;
            tracing::info!(rows = rows.len(), path = %path.display(), "export written");
        }
    }

    Ok(())
}

fn build_criteria(args: &Args) -> Result<FilterCriteria> {
    let mut criteria = FilterCriteria::new()
        .with_text(args.search.as_str())
        .with_payment_type(args.payment_type.as_str());

    criteria.status = FilterCriteria::parse_status(&args.status)
        .map_err(anyhow::Error::msg)
        .context("Invalid --status")?;

    if let (Some(from), Some(to)) = (args.from, args.to) {
        anyhow::ensure!(from <= to, "--from {} is after --to {}", from, to);
        criteria = criteria.with_date_range(from, to);
    } else if args.from.is_some() || args.to.is_some() {
        tracing::warn!("date filter needs both --from and --to; ignoring it");
    }

    Ok(criteria)
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}
