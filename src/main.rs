use anyhow::Context;
use clap::Parser;
use jaccard_index::output::{links_to_json, links_to_table, table_to_csv};
use jaccard_index::{FileLoader, JaccardBuilder, JaccardConfig, Round};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_EXPIRE_MS: u64 = 1000;

/// Pairwise Jaccard similarity between newline-delimited log files
#[derive(Parser, Debug)]
#[command(name = "jaccard")]
#[command(about = "Jaccard similarity between log files", long_about = None)]
struct Args {
    /// Print a CSV table instead of JSON links
    #[arg(long)]
    csv: bool,

    /// Log files, one member per line
    #[arg(required = true)]
    files: Vec<String>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cache expiry in milliseconds (default 1000)
    #[arg(long)]
    expire: Option<u64>,

    /// Maximum concurrent file reads
    #[arg(long)]
    throttle: Option<usize>,

    /// Per-read timeout in milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Compare (a, b) and (b, a) separately
    #[arg(long)]
    direction: bool,

    /// Pause between pairs in milliseconds
    #[arg(long)]
    wait: Option<u64>,

    /// Decimal places in the output
    #[arg(long, default_value_t = 3)]
    round: u32,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

async fn load_config(args: &Args) -> anyhow::Result<JaccardConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading config {}", path.display()))?;
            JaccardConfig::from_json(&json)?
        }
        None => JaccardConfig {
            expire: Some(DEFAULT_EXPIRE_MS),
            ..Default::default()
        },
    };

    if args.expire.is_some() {
        config.expire = args.expire;
    }
    if args.throttle.is_some() {
        config.throttle = args.throttle;
    }
    if args.timeout.is_some() {
        config.timeout = args.timeout;
    }
    if args.wait.is_some() {
        config.wait = args.wait;
    }
    config.direction |= args.direction;
    config.validate()?;
    Ok(config)
}

/// Usage errors exit with status 1; help and version output exit cleanly.
fn exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            std::process::exit(exit_code(&err));
        }
    };

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args).await?;
    info!("Comparing {} files with {:?}", args.files.len(), config);

    let engine = JaccardBuilder::<String>::new()
        .config(config)
        .loader(FileLoader::new().loader())
        .filter(Round(args.round))
        .build()?;

    let links = engine.links(args.files.clone(), None).await?;
    info!("{} links", links.len());

    if args.csv {
        print!("{}", table_to_csv(&links_to_table(&links)));
    } else {
        println!("{}", links_to_json(&links)?);
    }

    Ok(())
}
