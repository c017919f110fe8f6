//! dash-runner: headless front end for the e-commerce dashboard.
//!
//! Usage:
//!   dash-runner report --data main_data.csv --page rfm --from 2017-01-01 --to 2017-12-31
//!   dash-runner serve --data main_data.csv --config ./data
//!   dash-runner generate --out synthetic.csv --seed 7 --customers 2000

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use ecomdash_core::{
    config::DashConfig,
    delivery_view::DeliveryReport,
    geo_view::GeoReport,
    overview_view::OverviewReport,
    segmentation_view::SegmentationReport,
    synthetic::{self, SyntheticConfig},
    Dashboard, DatasetCache, OrderFilter, Page, ViewReport,
};
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dash-runner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render dashboard pages once and print them
    Report {
        /// Dataset CSV; defaults to dataset.path from the config
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory holding dashboard.json
        #[arg(short, long)]
        config: Option<String>,

        /// First purchase date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last purchase date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Restrict to one customer state
        #[arg(short, long)]
        region: Option<String>,

        #[arg(short, long, value_enum, default_value_t = PageArg::All)]
        page: PageArg,

        /// Print JSON instead of text tables
        #[arg(long)]
        json: bool,
    },

    /// Answer JSON-lines requests on stdin until EOF or quit
    Serve {
        #[arg(short, long)]
        data: Option<PathBuf>,

        #[arg(short, long)]
        config: Option<String>,
    },

    /// Write a synthetic dataset in the loader's CSV layout
    Generate {
        #[arg(short, long)]
        out: PathBuf,

        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 500)]
        customers: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PageArg {
    Overview,
    Delivery,
    Rfm,
    Geo,
    All,
}

impl PageArg {
    fn pages(self) -> Vec<Page> {
        match self {
            Self::Overview => vec![Page::Overview],
            Self::Delivery => vec![Page::Delivery],
            Self::Rfm => vec![Page::Segmentation],
            Self::Geo => vec![Page::Geo],
            Self::All => Page::ALL.to_vec(),
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    Options,
    Render {
        /// Every page when absent.
        page: Option<Page>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        region: Option<String>,
    },
    Reload,
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report {
            data,
            config,
            from,
            to,
            region,
            page,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let data = data.unwrap_or_else(|| PathBuf::from(&config.dataset.path));
            let mut cache = DatasetCache::new();
            let dataset = cache
                .get_or_load(&data)
                .with_context(|| format!("Cannot load dataset {}", data.display()))?;
            let dashboard = Dashboard::build(config, dataset);

            let filter = build_filter(from, to, region);
            let reports = page
                .pages()
                .into_iter()
                .map(|p| dashboard.render(p, &filter))
                .collect::<Result<Vec<_>, _>>()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print_header(&data, &filter, dashboard.dataset().len());
                for report in &reports {
                    print_report(report);
                }
            }
        }
        Command::Serve { data, config } => {
            let config = load_config(config.as_deref())?;
            let data = data.unwrap_or_else(|| PathBuf::from(&config.dataset.path));
            run_ipc_loop(config, &data)?;
        }
        Command::Generate {
            out,
            seed,
            customers,
        } => {
            let config = SyntheticConfig {
                customers,
                ..SyntheticConfig::default()
            };
            let rows = synthetic::generate(seed, &config);
            let file = File::create(&out)
                .with_context(|| format!("Cannot create {}", out.display()))?;
            synthetic::write_csv(&rows, BufWriter::new(file))?;

            println!("=== GENERATED ===");
            println!("  out:        {}", out.display());
            println!("  seed:       {seed}");
            println!("  customers:  {customers}");
            println!("  rows:       {}", rows.len());
        }
    }

    Ok(())
}

fn load_config(config_dir: Option<&str>) -> Result<DashConfig> {
    match config_dir {
        Some(dir) => DashConfig::load(dir),
        None => Ok(DashConfig::default()),
    }
}

fn build_filter(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    region: Option<String>,
) -> OrderFilter {
    if from.is_some() != to.is_some() {
        log::warn!("Date range needs both --from and --to; ignoring the single bound");
    }
    OrderFilter {
        start: from,
        end: to,
        region,
    }
}

fn run_ipc_loop(config: DashConfig, data: &Path) -> Result<()> {
    let mut cache = DatasetCache::new();
    let mut dashboard = Dashboard::build(config.clone(), cache.get_or_load(data)?);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                write_error(&mut stdout, &e)?;
                continue;
            }
        };

        let response = match request {
            IpcRequest::Quit => break,
            IpcRequest::Options => serde_json::json!({
                "pages": dashboard.pages(),
                "filters": dashboard.filter_options(),
            }),
            IpcRequest::Reload => {
                cache.invalidate(data);
                match cache.get_or_load(data) {
                    Ok(dataset) => {
                        dashboard = Dashboard::build(config.clone(), dataset);
                        serde_json::json!({ "rows": dashboard.dataset().len() })
                    }
                    Err(e) => {
                        write_error(&mut stdout, &e)?;
                        continue;
                    }
                }
            }
            IpcRequest::Render {
                page,
                from,
                to,
                region,
            } => {
                let filter = build_filter(from, to, region);
                let rendered = match page {
                    Some(page) => dashboard.render(page, &filter).map(serde_json::to_value),
                    None => dashboard.render_all(&filter).map(serde_json::to_value),
                };
                match rendered {
                    Ok(value) => value?,
                    Err(e) => {
                        write_error(&mut stdout, &e)?;
                        continue;
                    }
                }
            }
        };

        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(out: &mut impl Write, err: &dyn std::fmt::Display) -> Result<()> {
    let err_json = serde_json::json!({ "error": err.to_string() });
    writeln!(out, "{err_json}")?;
    out.flush()?;
    Ok(())
}

// ── Text output ──────────────────────────────────────────────────────────────

fn print_header(data: &Path, filter: &OrderFilter, rows: usize) {
    println!("E-commerce dashboard");
    println!("  data:    {}", data.display());
    println!("  rows:    {rows}");
    if let (Some(start), Some(end)) = (filter.start, filter.end) {
        println!("  range:   {start} .. {end}");
    }
    if let Some(region) = &filter.region {
        println!("  region:  {region}");
    }
    println!();
}

fn print_report(report: &ViewReport) {
    println!("=== {} ===", report.page().title().to_uppercase());
    match report {
        ViewReport::Overview(r) => print_overview(r),
        ViewReport::Delivery(r) => print_delivery(r),
        ViewReport::Segmentation(r) => print_segmentation(r),
        ViewReport::Geo(r) => print_geo(r),
    }
    println!();
}

fn print_overview(r: &OverviewReport) {
    println!("  orders:      {}", r.total_orders);
    println!("  customers:   {}", r.total_customers);
    println!("  revenue:     {:.2}", r.total_revenue);
    println!("  avg review:  {}", fmt_opt(r.avg_review_score, ""));

    println!("  -- orders per month --");
    for m in &r.monthly_orders {
        println!("  {} | {:>6}", m.month, m.orders);
    }
    println!("  -- review scores --");
    for b in &r.review_distribution {
        println!("  {} | {:>6}", b.score, b.rows);
    }
    println!("  -- top categories --");
    for c in &r.top_categories {
        println!("  {:<28} | {:>6} orders | {:>12.2}", c.category, c.orders, c.revenue);
    }
}

fn print_delivery(r: &DeliveryReport) {
    println!("  avg delivery days:  {}", fmt_opt(r.avg_delivery_days, ""));
    println!("  on-time rate:       {}", fmt_opt(r.on_time_rate_pct, "%"));
    println!("  delayed rows:       {}", r.delayed_rows);
    println!("  review on time:     {}", fmt_opt(r.avg_review_on_time, ""));
    println!("  review delayed:     {}", fmt_opt(r.avg_review_delayed, ""));

    println!("  -- satisfaction by delay --");
    for b in &r.satisfaction_by_delay {
        println!(
            "  {:<16} | {:>6} rows | satisfied {:>7} | unsatisfied {:>7}",
            b.label,
            b.rows,
            fmt_opt(b.satisfied_pct, "%"),
            fmt_opt(b.unsatisfied_pct, "%")
        );
    }
}

fn print_segmentation(r: &SegmentationReport) {
    println!("  customers:      {}", r.customers.len());
    println!("  champions:      {}", r.champions);
    println!("  at risk:        {}", r.at_risk);
    println!("  avg monetary:   {:.2}", r.avg_monetary);
    println!("  avg frequency:  {:.2}", r.avg_frequency);

    println!("  -- segments --");
    for d in &r.segment_details {
        println!(
            "  {:<18} | {:>6} | R {:>7.2} | F {:>5.2} | M {:>10.2}",
            d.segment.label(), d.count, d.avg_recency, d.avg_frequency, d.avg_monetary
        );
    }
    println!("  -- revenue by segment --");
    for s in &r.segment_revenue {
        println!("  {:<18} | {:>12.2}", s.segment.label(), s.revenue);
    }
}

fn print_geo(r: &GeoReport) {
    match &r.top_region {
        Some(region) => println!(
            "  top region:     {region} ({:.2}, {})",
            r.top_region_revenue,
            fmt_opt(r.top_region_share_pct, "%")
        ),
        None => println!("  (No rows in range)"),
    }
    println!(
        "  top {} share:    {}",
        r.concentration_top_n,
        fmt_opt(r.concentration_share_pct, "%")
    );

    println!("  -- regions by revenue --");
    for s in &r.top_by_revenue {
        println!(
            "  {:<4} | {:>6} customers | {:>6} orders | {:>12.2} | {:>8.2}/customer",
            s.region, s.customers, s.orders, s.revenue, s.revenue_per_customer
        );
    }
    println!("  -- revenue share --");
    for s in &r.revenue_shares {
        println!("  {:<6} | {:>12.2} | {:>6.1}%", s.label, s.revenue, s.share_pct);
    }
}

fn fmt_opt(value: Option<f64>, suffix: &str) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}{suffix}"))
}
