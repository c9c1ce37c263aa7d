use athena_connector::runner::{
    ConnectorOptionsBuilder, DateHandling, OutputLocation, QueryRunner, SdkAthena,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Clone)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Subcommand)]
enum Command {
    /// Run a SQL query against Athena and print the mapped result as JSON
    Query {
        /// Path to a file holding the SQL to execute
        #[arg(short, long, conflicts_with = "sql")]
        file: Option<PathBuf>,

        /// Inline SQL text to execute
        #[arg(short, long)]
        sql: Option<String>,

        /// Database that unqualified table names resolve to
        #[arg(short, long)]
        database: String,

        /// Data catalog to query
        #[arg(short, long, default_value = "AWSDataCatalog")]
        catalog: String,

        /// S3 location Athena writes spilled results to (s3://bucket/prefix)
        #[arg(short, long)]
        output_location: String,

        /// Fail the query on values in DATE columns that do not parse,
        /// instead of passing them through as strings
        #[arg(long)]
        strict_dates: bool,

        /// Give up after this many status checks (default: poll forever)
        #[arg(long)]
        max_poll_attempts: Option<u32>,

        /// Quiet mode - print only the result JSON
        #[arg(short, long)]
        quiet: bool,
    },

    /// Check that the configured connection is usable
    Test {
        /// Database that unqualified table names resolve to
        #[arg(short, long)]
        database: String,

        /// Data catalog to query
        #[arg(short, long, default_value = "AWSDataCatalog")]
        catalog: String,

        /// S3 location Athena writes spilled results to (s3://bucket/prefix)
        #[arg(short, long)]
        output_location: String,

        /// Run a real probe query against this table instead of the
        /// default always-succeeds check
        #[arg(long)]
        probe_table: Option<String>,

        /// Quiet mode - print only the verdict
        #[arg(short, long)]
        quiet: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Query {
            file,
            sql,
            database,
            catalog,
            output_location,
            strict_dates,
            max_poll_attempts,
            quiet,
        } => {
            init_tracing(quiet);

            let sql = match (sql, file) {
                (Some(sql), _) => sql,
                (None, Some(path)) => tokio::fs::read_to_string(&path).await.map_err(|e| {
                    anyhow::anyhow!("Failed to read query file {}: {}", path.display(), e)
                })?,
                (None, None) => {
                    return Err(anyhow::anyhow!("Provide a query with --sql or --file"));
                }
            };

            let options = ConnectorOptionsBuilder::default()
                .database(database)
                .catalog(catalog)
                .output_location(OutputLocation::parse(&output_location)?)
                .date_handling(if strict_dates {
                    DateHandling::Strict
                } else {
                    DateHandling::Lenient
                })
                .max_poll_attempts(max_poll_attempts)
                .build()?;

            let client = SdkAthena::from_env().await?;
            let runner = QueryRunner::new(Arc::new(client), options);
            let output = runner.run_query(&sql, None).await?;

            println!("{}", serde_json::to_string_pretty(&output)?);
            if !quiet {
                eprintln!("{} rows", output.expected_row_count);
            }
        }

        Command::Test {
            database,
            catalog,
            output_location,
            probe_table,
            quiet,
        } => {
            init_tracing(quiet);

            let mut builder = ConnectorOptionsBuilder::default();
            builder
                .database(database)
                .catalog(catalog)
                .output_location(OutputLocation::parse(&output_location)?);
            if let Some(table) = probe_table {
                builder.test_table_name(table).probe_on_test(true);
            }
            let options = builder.build()?;

            let client = SdkAthena::from_env().await?;
            let runner = QueryRunner::new(Arc::new(client), options);

            if runner.test_connection().await? {
                println!("connection ok");
            } else {
                println!("connection failed");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn init_tracing(quiet: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter = if quiet {
        EnvFilter::new("athena_connector=warn")
    } else {
        EnvFilter::new("athena_connector=info")
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
