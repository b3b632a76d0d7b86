//! SODA CLI
//!
//! Command-line interface for querying Socrata Open Data datasets.

use clap::{Args, Parser, Subcommand};
use soda_client::{
    completion_queue, ClientConfig, CompletionQueue, DatasetClient, QueryBuilder, Row, SodaError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soda")]
#[command(version, about = "Socrata Open Data query CLI", long_about = None)]
struct Cli {
    /// Domain of the SODA endpoint
    #[arg(short, long, env = "SODA_DOMAIN", default_value = "data.sfgov.org", global = true)]
    domain: String,

    /// Application token sent as X-App-Token
    #[arg(short, long, env = "SODA_APP_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Use plain HTTP (local endpoints only)
    #[arg(long, global = true)]
    http: bool,

    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a dataset and print one JSON row per line
    Query(QueryArgs),

    /// Fetch a single row by identifier
    Row {
        /// Dataset identifier
        dataset: String,

        /// Row identifier
        row_id: String,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Dataset identifier, e.g. wwmu-gmzc
    dataset: String,

    /// $select expression
    #[arg(long)]
    select: Option<String>,

    /// $where expression
    #[arg(long = "where")]
    filter: Option<String>,

    /// $q full text search
    #[arg(short, long)]
    q: Option<String>,

    /// Order by column, ascending
    #[arg(long, conflicts_with = "order_desc")]
    order: Option<String>,

    /// Order by column, descending
    #[arg(long)]
    order_desc: Option<String>,

    /// $group column
    #[arg(long)]
    group: Option<String>,

    /// $limit
    #[arg(short, long, allow_hyphen_values = true)]
    limit: Option<i64>,

    /// $offset
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<i64>,

    /// Column equality filter as column=value (repeatable)
    #[arg(short = 'c', long = "column", value_parser = parse_column)]
    columns: Vec<(String, String)>,

    /// Print the request URL instead of running the query
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match build_client(&cli) {
        Ok(client) => match cli.command {
            Commands::Query(args) => {
                let (dispatcher, queue) = completion_queue();
                let client = client.with_dispatcher(Arc::new(dispatcher));
                let dry_run = args.dry_run;
                let query = build_query(&client, args);

                if dry_run {
                    query.url().map(|url| println!("{}", url)).map_err(Into::into)
                } else {
                    run_query(&query, queue, cli.pretty).await
                }
            }
            Commands::Row { dataset, row_id } => {
                show_row(&client, &dataset, &row_id, cli.pretty).await
            }
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn build_client(cli: &Cli) -> Result<DatasetClient, Box<dyn std::error::Error>> {
    let token = cli
        .token
        .clone()
        .ok_or("No app token given. Use --token or set SODA_APP_TOKEN.")?;

    let mut builder = ClientConfig::builder(cli.domain.clone(), token)
        .timeout(Duration::from_secs(cli.timeout_secs));
    if cli.http {
        builder = builder.insecure_http();
    }

    Ok(DatasetClient::new(builder.build()?)?)
}

fn build_query(client: &DatasetClient, args: QueryArgs) -> QueryBuilder {
    let mut query = client.query_dataset(args.dataset);
    if let Some(select) = args.select {
        query = query.select(select);
    }
    if let Some(filter) = args.filter {
        query = query.filter(filter);
    }
    if let Some(q) = args.q {
        query = query.full_text(q);
    }
    if let Some(column) = args.order {
        query = query.order_ascending(column);
    }
    if let Some(column) = args.order_desc {
        query = query.order_descending(column);
    }
    if let Some(group) = args.group {
        query = query.group(group);
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = args.offset {
        query = query.offset(offset);
    }
    for (column, value) in args.columns {
        query = query.filter_column(column, value);
    }
    query
}

/// Run `query` and print its rows from this task as `queue` delivers them.
async fn run_query(
    query: &QueryBuilder,
    mut queue: CompletionQueue,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let failure: Arc<Mutex<Option<SodaError>>> = Arc::new(Mutex::new(None));
    let printed = Arc::new(AtomicUsize::new(0));

    let sink = failure.clone();
    let count = printed.clone();
    let task = query.each(move |row| match row {
        Ok(row) => {
            print_row(&row, pretty);
            count.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(err);
            }
        }
    });

    // Drain the queue while watching the fetch task, so a failed task
    // surfaces as an error instead of leaving the queue waiting forever
    let mut task = task;
    let finished_first = tokio::select! {
        _ = queue.run_next() => None,
        joined = &mut task => Some(joined),
    };
    match finished_first {
        None => task.await?,
        Some(joined) => {
            joined?;
            queue.run_pending();
        }
    }

    let failed = failure.lock().ok().and_then(|mut slot| slot.take());
    if let Some(err) = failed {
        return Err(err.into());
    }
    tracing::info!(rows = printed.load(Ordering::Relaxed), "Query complete");
    Ok(())
}

async fn show_row(
    client: &DatasetClient,
    dataset: &str,
    row_id: &str,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let row = client.fetch_row(row_id, dataset).await?;
    print_row(&row, pretty);
    Ok(())
}

fn print_row(row: &Row, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(row)
    } else {
        serde_json::to_string(row)
    };
    match rendered {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("Error: failed to render row: {}", e),
    }
}

fn parse_column(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected column=value, got '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use soda_client::{DatasetRequest, Transport, TransportResponse};

    #[test]
    fn test_parse_column() {
        assert_eq!(
            parse_column("director=Alfred Hitchcock").unwrap(),
            ("director".to_string(), "Alfred Hitchcock".to_string())
        );
        assert_eq!(
            parse_column("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_column("novalue").is_err());
        assert!(parse_column("=x").is_err());
    }

    #[test]
    fn test_cli_parses_query() {
        let cli = Cli::try_parse_from([
            "soda",
            "--token",
            "abc",
            "query",
            "wwmu-gmzc",
            "--order",
            "title",
            "--limit",
            "-1",
            "-c",
            "release_year=1958",
        ])
        .unwrap();

        assert_eq!(cli.token.as_deref(), Some("abc"));
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.dataset, "wwmu-gmzc");
                assert_eq!(args.order.as_deref(), Some("title"));
                assert_eq!(args.limit, Some(-1));
                assert_eq!(
                    args.columns,
                    vec![("release_year".to_string(), "1958".to_string())]
                );
            }
            _ => panic!("Expected query command"),
        }
    }

    #[test]
    fn test_cli_rejects_two_orders() {
        let result = Cli::try_parse_from([
            "soda",
            "query",
            "wwmu-gmzc",
            "--order",
            "title",
            "--order-desc",
            "title",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dry_run_url_for_chained_query() {
        let cli = Cli::try_parse_from([
            "soda",
            "--token",
            "abc",
            "query",
            "wwmu-gmzc",
            "--order-desc",
            "release_year",
            "--where",
            "title = 'Vertigo'",
            "--limit",
            "10",
            "-c",
            "director=Alfred Hitchcock",
            "--dry-run",
        ])
        .unwrap();
        let client = build_client(&cli).unwrap();

        match cli.command {
            Commands::Query(args) => {
                assert!(args.dry_run);
                let url = build_query(&client, args).url().unwrap();
                assert_eq!(
                    url.as_str(),
                    "https://data.sfgov.org/resource/wwmu-gmzc.json\
                     ?%24limit=10\
                     &%24order=release_year%20DESC\
                     &%24where=title%20%3D%20%27Vertigo%27\
                     &director=Alfred%20Hitchcock"
                );
            }
            _ => panic!("Expected query command"),
        }
    }

    #[tokio::test]
    async fn test_run_query_reports_failed_fetch() {
        let cli = Cli::try_parse_from([
            "soda", "--token", "abc", "--http", "--domain", "127.0.0.1:9", "query", "x",
        ])
        .unwrap();
        let (dispatcher, queue) = completion_queue();
        let client = build_client(&cli).unwrap().with_dispatcher(Arc::new(dispatcher));

        let result = run_query(&client.query_dataset("wwmu-gmzc"), queue, false).await;
        assert!(result.is_err());
    }

    struct PanickingTransport;

    #[async_trait::async_trait]
    impl Transport for PanickingTransport {
        async fn get(&self, _request: DatasetRequest) -> soda_client::Result<TransportResponse> {
            panic!("transport blew up");
        }
    }

    #[tokio::test]
    async fn test_run_query_reports_panicked_fetch() {
        let config = ClientConfig::builder("data.sfgov.org", "abc").build().unwrap();
        let (dispatcher, queue) = completion_queue();
        let client = DatasetClient::with_transport(config, Arc::new(PanickingTransport))
            .unwrap()
            .with_dispatcher(Arc::new(dispatcher));

        // The panicked task never enqueues a job, so this must not wait on the queue
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_query(&client.query_dataset("wwmu-gmzc"), queue, false),
        )
        .await
        .expect("run_query hung on a panicked fetch");
        assert!(result.is_err());
    }
}
