use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use incidences::Result;
use incidences::config::{Config, MAX_CONCURRENCY};
use incidences::error::{ConfigError, Error, SinkError};
use incidences::open_data::{DecodedRecord, IncidentRecord, OpenDataClient};
use incidences::telemetry::init_tracing;
use incidences::tinybird::{Delivery, IncidenceEvent, TinybirdClient};
use incidences::types::{RecordErrorPolicy, RunSummary};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use super::cli::Cli;

const DEFAULT_CONFIG: &str = "incidences.toml";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = Config::from_env_and_file(&config_path)?;

    if let Some(concurrency) = cli.concurrency {
        if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(Error::from(ConfigError::InvalidField {
                field: "cli.concurrency",
                message: format!("value must be between 1 and {MAX_CONCURRENCY}"),
            }));
        }
        config.concurrency = concurrency;
    }
    if let Some(policy) = cli.on_record_error {
        config.on_record_error = policy;
    }

    let source = OpenDataClient::new(&config.source, cli.insecure)?;
    let sink = TinybirdClient::new(&config.sink, cli.insecure)?;

    run_once(&source, &sink, &config, cli.dry_run)
        .await
        .map(|_| ())
}

/// Fetch the count, fetch the list, forward every incident.
pub(super) async fn run_once(
    source: &OpenDataClient,
    sink: &TinybirdClient,
    config: &Config,
    dry_run: bool,
) -> Result<RunSummary> {
    let count = source.count_last_days().await?;
    let records = source.requests(&count).await?;

    let mut summary = RunSummary {
        listed: records.len(),
        ..RunSummary::default()
    };
    let policy = config.on_record_error;

    let outcome = if dry_run || config.concurrency <= 1 {
        forward_sequential(sink, records, policy, dry_run, &mut summary).await
    } else {
        forward_concurrent(sink, records, policy, config.concurrency, &mut summary).await
    };

    info!(
        count = %count,
        listed = summary.listed,
        forwarded = summary.forwarded,
        rejected = summary.rejected,
        skipped = summary.skipped,
        failed = summary.failed,
        dry_run,
        "run finished"
    );
    outcome.map(|()| summary)
}

async fn forward_sequential(
    sink: &TinybirdClient,
    records: Vec<DecodedRecord>,
    policy: RecordErrorPolicy,
    dry_run: bool,
    summary: &mut RunSummary,
) -> Result<()> {
    for decoded in records {
        let Some(event) = prepare(decoded, policy, summary)? else {
            continue;
        };
        if dry_run {
            info!(event_id = %event.id, ?event, "dry-run: would forward event");
            continue;
        }
        let outcome = sink.send_event(&event).await;
        settle(outcome, &event.id, policy, summary)?;
    }
    Ok(())
}

/// Up to `concurrency` POSTs in flight. Records are still decoded in order
/// and nothing new is spawned once the run has failed; POSTs already in
/// flight are allowed to finish.
async fn forward_concurrent(
    sink: &TinybirdClient,
    records: Vec<DecodedRecord>,
    policy: RecordErrorPolicy,
    concurrency: usize,
    summary: &mut RunSummary,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks: JoinSet<(String, Result<Delivery>)> = JoinSet::new();
    let mut outcome = Ok(());

    'records: for decoded in records {
        while let Some(joined) = tasks.try_join_next() {
            if let Err(err) = settle_joined(joined, policy, summary) {
                outcome = Err(err);
                break 'records;
            }
        }

        let event = match prepare(decoded, policy, summary) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(err) => {
                outcome = Err(err);
                break;
            }
        };

        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let sink = sink.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let delivery = sink.send_event(&event).await;
            (event.id, delivery)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let settled = settle_joined(joined, policy, summary);
        if outcome.is_ok() {
            outcome = settled;
        }
    }
    outcome
}

/// Turn a decoded list element into an event, or apply the policy to a
/// malformed one. `Ok(None)` means the record was skipped.
fn prepare(
    decoded: DecodedRecord,
    policy: RecordErrorPolicy,
    summary: &mut RunSummary,
) -> Result<Option<IncidenceEvent>> {
    match decoded {
        Ok(record) => {
            log_record(&record);
            Ok(Some(IncidenceEvent::from_record(record, Utc::now())))
        }
        Err(shape) => match policy {
            RecordErrorPolicy::Abort => Err(shape.into()),
            RecordErrorPolicy::Skip => {
                warn!(index = shape.index, error = %shape, "skipping malformed incident");
                summary.skipped += 1;
                Ok(None)
            }
        },
    }
}

fn settle(
    outcome: Result<Delivery>,
    event_id: &str,
    policy: RecordErrorPolicy,
    summary: &mut RunSummary,
) -> Result<()> {
    match outcome {
        Ok(delivery) => {
            summary.forwarded += 1;
            if !delivery.accepted() {
                summary.rejected += 1;
            }
            Ok(())
        }
        Err(err) => match policy {
            RecordErrorPolicy::Abort => Err(err),
            RecordErrorPolicy::Skip => {
                error!(event_id, error = %err, "failed to forward event");
                summary.failed += 1;
                Ok(())
            }
        },
    }
}

fn settle_joined(
    joined: std::result::Result<(String, Result<Delivery>), JoinError>,
    policy: RecordErrorPolicy,
    summary: &mut RunSummary,
) -> Result<()> {
    match joined {
        Ok((event_id, outcome)) => settle(outcome, &event_id, policy, summary),
        Err(join_err) => match policy {
            RecordErrorPolicy::Abort => Err(SinkError::Task { source: join_err }.into()),
            RecordErrorPolicy::Skip => {
                error!(error = %join_err, "forwarding task failed");
                summary.failed += 1;
                Ok(())
            }
        },
    }
}

fn log_record(record: &IncidentRecord) {
    info!(
        id = %record.id,
        incidence_type = %record.kind,
        description = %record.description,
        requested_date = %record.requested_at,
        address = %record.address,
        latitude = record.latitude,
        longitude = record.longitude,
        "processing incident"
    );
}
