//! influx-orm CLI
//!
//! Command-line interface for InfluxDB operations:
//! - Query a measurement through the query builder
//! - Write line protocol
//! - Delete points by example
//! - Check the server and generate config

use clap::{Parser, Subcommand};
use influx_orm::client::InfluxClient;
use influx_orm::config::{generate_default_config, Config, LoggingConfig};
use influx_orm::query::{parse_assignment, parse_criteria, Literal, Query, QueryResult, Row};
use std::fs::OpenOptions;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "influx-orm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query, write and delete InfluxDB points")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the usual locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

/// Options shared by every command that selects points
#[derive(clap::Args)]
pub struct Selector {
    /// Measurement to read from
    measurement: String,
    /// Filter expression, e.g. "speed > 10 OR name = 'car'" (repeat to AND)
    #[arg(short = 'w', long = "filter")]
    filters: Vec<String>,
    /// Free-text match in key=value format (repeat to OR)
    #[arg(short, long)]
    search: Vec<String>,
    /// Order field; prefix with '-' for descending
    #[arg(short, long)]
    order_by: Option<String>,
    #[arg(long)]
    limit: Option<u64>,
    #[arg(long)]
    offset: Option<u64>,
    #[arg(long)]
    slimit: Option<u64>,
    #[arg(long)]
    soffset: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query a measurement
    Query {
        #[command(flatten)]
        selector: Selector,
        /// Fields to select (comma-separated or multiple args)
        #[arg(long)]
        select: Vec<String>,
        /// Wrap the single selected field in DISTINCT()
        #[arg(long)]
        distinct: bool,
        /// Print the number of matching points
        #[arg(long, conflicts_with = "sum")]
        count: bool,
        /// Print the sum of the selected field
        #[arg(long)]
        sum: bool,
        /// Print the query instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Write line protocol from a file or stdin
    Write {
        /// Input file (default: stdin)
        path: Option<PathBuf>,
    },

    /// Delete the points a query matches
    Delete {
        #[command(flatten)]
        selector: Selector,
        /// Only delete rows whose column equals the value, key=value format
        #[arg(short = 'm', long = "match")]
        matches: Vec<String>,
        /// Show what would be deleted
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that the server is reachable
    Ping,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let config = generate_default_config();
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &config)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", config),
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;

    tracing::debug!(
        host = %config.influxdb.host,
        port = config.influxdb.port,
        database = %config.influxdb.database,
        "influx-orm v{}",
        env!("CARGO_PKG_VERSION")
    );

    let client = Arc::new(InfluxClient::new(config.influxdb.clone())?);

    match cli.command {
        Commands::Query {
            selector,
            select,
            distinct,
            count,
            sum,
            dry_run,
        } => {
            let fields: Vec<String> = select
                .iter()
                .flat_map(|f| f.split(',').map(|s| s.trim().to_string()))
                .filter(|f| !f.is_empty())
                .collect();

            let mut query = build_query(client, &selector)?.select(fields);
            if distinct {
                query = query.distinct();
            }

            if dry_run {
                println!("{}", query);
            } else if count {
                println!("{}", query.count().await?);
            } else if sum {
                println!("{}", query.sum().await?);
            } else {
                let rows = query.fetch().await?;
                print_rows(rows, &cli.format)?;
            }
        }

        Commands::Write { path } => {
            let mut body = String::new();
            match path {
                Some(path) => body = std::fs::read_to_string(&path)?,
                None => {
                    std::io::stdin().read_to_string(&mut body)?;
                }
            }

            let lines: Vec<&str> = body
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .collect();

            if lines.is_empty() {
                println!("Nothing to write");
            } else {
                client.write(&lines.join("\n")).await?;
                println!("Wrote {} points", lines.len());
            }
        }

        Commands::Delete {
            selector,
            matches,
            dry_run,
        } => {
            let matches = matches
                .iter()
                .map(|m| parse_assignment(m))
                .collect::<QueryResult<Vec<(String, Literal)>>>()?;

            let mut query = build_query(client, &selector)?;

            if dry_run {
                println!("{}", query);
                let rows = query.fetch().await?;
                println!("{} candidate rows", rows.len());
            } else if query.delete(&matches).await? {
                println!("Deleted matching points from {}", query.measurement());
            } else {
                println!("No points matched");
            }
        }

        Commands::Ping => match client.ping().await {
            Ok(()) => println!("InfluxDB at {} is up", client.base_url()),
            Err(e) => {
                eprintln!("Cannot reach InfluxDB at {}", client.base_url());
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Build the query a selector describes.
///
/// Bounds are applied before any selection since setting one clears the
/// selected fields.
fn build_query(client: Arc<InfluxClient>, selector: &Selector) -> QueryResult<Query> {
    let mut query = Query::new(client).from_measurement(&selector.measurement);

    for expression in &selector.filters {
        query = query.filter(parse_criteria(expression)?);
    }

    let search = selector
        .search
        .iter()
        .map(|s| parse_assignment(s))
        .collect::<QueryResult<Vec<_>>>()?;
    if !search.is_empty() {
        query = query.search_query(search)?;
    }

    if let Some(order) = &selector.order_by {
        query = query.order_by(order.as_str());
    }
    if let Some(n) = selector.limit {
        query = query.limit(n);
    }
    if let Some(n) = selector.offset {
        query = query.offset(n);
    }
    if let Some(n) = selector.slimit {
        query = query.slimit(n);
    }
    if let Some(n) = selector.soffset {
        query = query.soffset(n);
    }

    Ok(query)
}

fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("influx_orm={}", config.level)));

    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    let layer = if config.format == "json" {
        layer.json().boxed()
    } else {
        layer.boxed()
    };

    tracing_subscriber::registry().with(layer).with(filter).init();
    Ok(())
}

fn print_rows(rows: &[Row], format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    let Some(first) = rows.first() else {
        println!("No data");
        return Ok(());
    };

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.values().iter().map(format_cell).collect())
        .collect();

    let widths: Vec<usize> = first
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .filter_map(|r| r.get(i).map(String::len))
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = first
        .columns()
        .iter()
        .zip(&widths)
        .map(|(name, w)| format!("{:<w$}", name, w = w))
        .collect();
    println!("{}", header.join(" | "));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)));

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = w))
            .collect();
        println!("{}", line.join(" | "));
    }

    println!();
    println!("{} rows", rows.len());
    Ok(())
}

fn format_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "-".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
