//! book-scout - Compare one book across marketplaces, libraries and stores

use anyhow::Result;
use book_scout::commands::{BatchCommand, DigestCommand, SearchCommand};
use book_scout::config::{Config, OutputFormat};
use book_scout::format::Formatter;
use book_scout::models::Format;
use book_scout::query::{BindingHint, QuerySpec};
use book_scout::sources::AdapterRegistry;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "book-scout",
    version,
    about = "Compare prices, formats and availability of a book",
    long_about = "Searches used-book marketplaces, public library catalogs, ebook stores and rating sites \
                  for one book and compares the results in your home currency."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (table, json, markdown, csv)
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Per-source timeout in seconds
    #[arg(long, global = true, env = "BOOK_SCOUT_TIMEOUT")]
    timeout: Option<u64>,

    /// Delay between requests to the same source in milliseconds (batch mode)
    #[arg(long, global = true, env = "BOOK_SCOUT_DELAY")]
    delay: Option<u64>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "BOOK_SCOUT_PROXY")]
    proxy: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// What to look for. Multi-word values may be given unquoted.
#[derive(Args)]
struct QueryArgs {
    /// Author name
    #[arg(short, long, num_args = 1..)]
    author: Vec<String>,

    /// Book title
    #[arg(short, long, num_args = 1..)]
    title: Vec<String>,

    /// Free-text keywords
    #[arg(short, long, num_args = 1..)]
    keywords: Vec<String>,

    /// Language filter (marketplace only)
    #[arg(long)]
    language: Option<String>,

    /// Publisher filter (marketplace only)
    #[arg(long)]
    publisher: Option<String>,

    /// Binding: any, hardcover, softcover
    #[arg(long)]
    binding: Option<BindingHint>,

    /// Sources to search (comma-separated); defaults to all
    #[arg(long, value_delimiter = ',')]
    sources: Option<Vec<String>>,

    /// Only show these formats (comma-separated: book, ebook, audiobook, web-ebook)
    #[arg(long, value_delimiter = ',')]
    formats: Option<Vec<Format>>,
}

impl QueryArgs {
    fn to_query(&self) -> Result<QuerySpec> {
        let mut builder = QuerySpec::builder()
            .author(self.author.join(" "))
            .title(self.title.join(" "))
            .keywords(self.keywords.join(" "));

        if let Some(language) = &self.language {
            builder = builder.language(language);
        }
        if let Some(publisher) = &self.publisher {
            builder = builder.publisher(publisher);
        }
        if let Some(binding) = self.binding {
            builder = builder.binding(binding);
        }

        Ok(builder.build()?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search every source and compare the listings
    #[command(alias = "s")]
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// One summary line per source
    #[command(alias = "d")]
    Digest {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Run a file of `author;title;keywords` queries
    #[command(alias = "b")]
    Batch {
        /// Query file, one query per line
        file: PathBuf,

        /// Column separator
        #[arg(long, default_value = ";")]
        separator: String,

        /// Sources to search (comma-separated); defaults to all
        #[arg(long, value_delimiter = ',')]
        sources: Option<Vec<String>>,
    },

    /// List configured sources
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; abandoning pending requests");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Search { query } => {
            let spec = query.to_query()?;
            if let Some(sources) = query.sources {
                config.sources = sources;
            }

            let cmd = SearchCommand::new(config).with_formats(query.formats.unwrap_or_default());
            let output = cmd.execute(&spec, &cancel).await?;
            println!("{}", output);
        }

        Commands::Digest { query } => {
            let spec = query.to_query()?;
            if let Some(sources) = query.sources {
                config.sources = sources;
            }

            let cmd = DigestCommand::new(config).with_formats(query.formats.unwrap_or_default());
            let output = cmd.execute(&spec, &cancel).await?;
            println!("{}", output);
        }

        Commands::Batch { file, separator, sources } => {
            if let Some(sources) = sources {
                config.sources = sources;
            }

            let cmd = BatchCommand::new(config).with_separator(separator);
            let output = cmd.execute(&file, &cancel).await?;
            println!("{}", output);
        }

        Commands::Sources => {
            let registry = AdapterRegistry::from_config(&config);
            println!("{}", Formatter::new(config.format).format_sources(&registry));
        }
    }

    Ok(())
}
