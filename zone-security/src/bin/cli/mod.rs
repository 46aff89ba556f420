use color_eyre::Report;
use snapshot_lib::collector::{DEFAULT_API_URL, DEFAULT_COOLDOWN, DEFAULT_REQUEST_TIMEOUT};
use snapshot_lib::{load_zones, DataCollector, HttpZoneApi, SnapshotCache};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zone_security::pipeline::{analyze, load_or_collect};
use zone_security::quorum::{Threshold, ValidatorOrdering};
use zone_security::{bundled_zones, report};

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LOG_FILTER: &str = "zone_security=info,snapshot_lib=info";

/// Estimate how many validators of each zone would need to collude to break
/// its consensus guarantees.
#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Cli {
    /// Path to a json encoded list of `{"id", "name"}` zones to assess.
    /// Defaults to the list bundled with the tool (resources/zones.json)
    #[structopt(long)]
    zones: Option<PathBuf>,

    /// Snapshot cache. When present, data is read from it instead of being collected
    #[structopt(long, default_value = "zonesdata.json")]
    cache: PathBuf,

    /// Csv report output path
    #[structopt(long, default_value = "zones-security-thresholds.csv")]
    output: PathBuf,

    /// `liveness` (33.33%), `safety` (66.66%) or a custom percentage of the bonded stake
    #[structopt(long, default_value = "liveness")]
    threshold: Threshold,

    /// Base url of the staking api, `{id}` is replaced by the zone id
    #[structopt(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Timeout for every request to the staking api, in seconds.
    /// Defaults to the collector's request timeout
    #[structopt(long)]
    timeout: Option<u64>,

    /// Pause between two zones, in milliseconds.
    /// Defaults to the collector's cooldown
    #[structopt(long)]
    cooldown_ms: Option<u64>,

    /// Collect fresh data even if a snapshot cache is present
    #[structopt(long)]
    refresh: bool,

    /// Walk validators in the order reported by the api instead of sorting them by stake
    #[structopt(long)]
    preserve_order: bool,

    /// Increase log verbosity, can be repeated
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

impl Cli {
    pub fn exec(self) -> Result<(), Report> {
        let Self {
            zones,
            cache,
            output,
            threshold,
            api_url,
            timeout,
            cooldown_ms,
            refresh,
            preserve_order,
            verbose,
        } = self;

        init_logging(verbose);

        let cache = SnapshotCache::new(cache);
        let timeout = timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let cooldown = cooldown_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_COOLDOWN);
        let api = HttpZoneApi::new(api_url, timeout)?;
        let collector = DataCollector::new(api).with_cooldown(cooldown);

        let zone_list = || match &zones {
            Some(path) => load_zones(path),
            None => bundled_zones(),
        };
        let (snapshots, origin) = load_or_collect(&cache, &collector, zone_list, refresh)?;
        info!(zones = snapshots.len(), ?origin, %threshold, "analyzing zones");

        let ordering = if preserve_order {
            ValidatorOrdering::AsReported
        } else {
            ValidatorOrdering::ByStake
        };
        let results = analyze(&snapshots, threshold, ordering);

        report::write_console(std::io::stdout().lock(), &results)?;
        report::write_csv(BufWriter::new(File::create(&output)?), &results)?;
        info!(path = %output.display(), "csv report written");

        Ok(())
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        1 => EnvFilter::new("zone_security=debug,snapshot_lib=debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
