use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use gb_harvest::chunk::read_id_list;
use gb_harvest::config::{load_list, HarvestConfig, DEFAULT_CHUNK_SIZE};
use gb_harvest::fetch::{EntrezClient, EntrezSettings, RetryPolicy, ThreadSleeper};
use gb_harvest::writer::{OutputPaths, OutputWriter, TableLayout};
use gb_harvest::Pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "gb-harvest",
    version,
    about = "Fetch GenBank records from NCBI and extract a gene (COI by default)",
    long_about = "Fetches the GenBank records of a list of accessions from NCBI in chunks, \
                  writes the sequence of the first feature naming the target gene to a FASTA \
                  file, its annotations to a table, and every record that could not be \
                  resolved to a log."
)]
struct Args {
    /// File with one accession ID per line
    #[arg(value_name = "ACCESSIONS")]
    accessions: PathBuf,

    /// Gene names to look for, one per line
    #[arg(short, long, value_name = "FILE")]
    recognition: Option<PathBuf>,

    /// Feature types a gene may come from, one per line
    #[arg(short, long, value_name = "FILE")]
    feature: Option<PathBuf>,

    /// Table columns, one per line
    #[arg(long, visible_alias = "hl", value_name = "FILE")]
    header: Option<PathBuf>,

    /// Directory for the FASTA file, the table and the log
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Accessions per request
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Contact address sent along with every request
    #[arg(long, env = "NCBI_EMAIL")]
    email: Option<String>,

    /// NCBI API key, raises the request rate limit
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Write the table in the legacy layout (trailing tabs, id glued to the first cell)
    #[arg(long)]
    legacy_table: bool,

    /// Log the IDs of chunks that could not be fetched
    #[arg(long)]
    log_fetch_failures: bool,

    /// Give up on a chunk after this many throttled attempts
    #[arg(long, value_name = "N", default_value_t = RetryPolicy::default().max_throttle_retries)]
    max_throttle_retries: u32,
}

impl Args {
    fn config(&self) -> anyhow::Result<HarvestConfig> {
        let mut config = HarvestConfig::default()
            .chunk_size(self.chunk_size)
            .log_fetch_failures(self.log_fetch_failures)
            .retry(RetryPolicy {
                max_throttle_retries: self.max_throttle_retries,
                ..RetryPolicy::default()
            });
        if self.legacy_table {
            config = config.layout(TableLayout::Legacy);
        }
        if let Some(ref path) = self.recognition {
            config = config.recognition(load_list(path)?.into_iter().collect());
        }
        if let Some(ref path) = self.feature {
            config = config.feature_types(load_list(path)?.into_iter().collect());
        }
        if let Some(ref path) = self.header {
            config = config.headers(load_list(path)?.into_iter().collect());
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info");
    env_logger::Builder::from_env(env).init();
    let args = Args::parse();

    let config = args.config()?;
    let ids = read_id_list(&args.accessions)?;
    info!("{} accessions in {}", ids.len(), args.accessions.display());

    let paths = OutputPaths::derive(&args.accessions, &args.out_dir);
    let writer = OutputWriter::create(&paths, config.layout)
        .with_context(|| format!("Unable to create output files in {}", args.out_dir.display()))?;
    let client = EntrezClient::new(EntrezSettings {
        email: args.email.clone(),
        api_key: args.api_key.clone(),
        ..EntrezSettings::default()
    })?;

    let mut pipeline = Pipeline::new(client, ThreadSleeper, writer, config)?;
    pipeline.run(&ids)?;
    info!(
        "Wrote {}, {} and {}",
        paths.sequences.display(),
        paths.table.display(),
        paths.log.display()
    );
    Ok(())
}
