use std::path::PathBuf;
use std::time::{Duration, Instant};

use netsdr_session::{NetworkConfig, SessionConfig};
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, parse_width, runtime, RecordArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_record_summary, OutputFormat, RecordSummary};

struct Plan {
    network: NetworkConfig,
    config: SessionConfig,
    frequency: Option<u64>,
    channel: u8,
    limit: Option<Duration>,
}

pub fn run(args: RecordArgs, format: OutputFormat) -> CliResult<i32> {
    let plan = plan(&args)?;
    let summary = runtime()?.block_on(record(plan))?;
    print_record_summary(&summary, format);
    Ok(SUCCESS)
}

fn plan(args: &RecordArgs) -> CliResult<Plan> {
    let limit = args.duration.as_deref().map(parse_duration).transpose()?;
    let mut network = args.target.network()?;
    network.data_bind = args.data_bind.clone();

    let config = SessionConfig {
        sample_rate: args.sample_rate,
        sample_width: parse_width(args.width)?,
        sink_path: args.output.clone(),
        ..args.target.session()?
    };

    Ok(Plan {
        network,
        config,
        frequency: args.frequency,
        channel: args.channel,
        limit,
    })
}

async fn record(plan: Plan) -> CliResult<RecordSummary> {
    let path: PathBuf = plan.config.sink_path.clone();
    let bits = plan.config.sample_width.bits();

    let mut session = netsdr_session::connect(&plan.network, plan.config)
        .await
        .map_err(|err| session_error("connect failed", err))?;

    if let Some(hz) = plan.frequency {
        session
            .change_frequency(hz, plan.channel)
            .await
            .map_err(|err| session_error("tune failed", err))?;
    }

    session
        .start_acquisition()
        .await
        .map_err(|err| session_error("start failed", err))?;
    let started = Instant::now();

    wait_for_stop(plan.limit).await;

    let stopped = session.stop_acquisition().await;
    let elapsed = started.elapsed();
    let samples = session.samples_written();
    session.disconnect();
    stopped.map_err(|err| session_error("stop failed", err))?;

    Ok(RecordSummary::new(&path, bits, samples, elapsed))
}

async fn wait_for_stop(limit: Option<Duration>) {
    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupted; stopping capture"),
            Err(err) => {
                warn!(error = %err, "cannot watch for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };

    match limit {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit) => debug!(?limit, "capture duration elapsed"),
                _ = interrupted => {}
            }
        }
        None => interrupted.await,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cmd::Command;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: Command,
    }

    fn record_args(extra: &[&str]) -> RecordArgs {
        let mut argv = vec!["netsdr", "record", "10.0.0.5"];
        argv.extend_from_slice(extra);
        match Harness::try_parse_from(argv).unwrap().command {
            Command::Record(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn plan_carries_capture_settings() {
        let args = record_args(&[
            "--width",
            "24",
            "--sample-rate",
            "250000",
            "--data-bind",
            "127.0.0.1:0",
            "--duration",
            "750ms",
            "-o",
            "/tmp/capture.bin",
        ]);
        let plan = plan(&args).unwrap();

        assert_eq!(plan.network.host, "10.0.0.5");
        assert_eq!(plan.network.data_bind, "127.0.0.1:0");
        assert_eq!(plan.config.sample_rate, 250_000);
        assert_eq!(plan.config.sample_width.bits(), 24);
        assert_eq!(plan.config.sink_path, PathBuf::from("/tmp/capture.bin"));
        assert_eq!(plan.limit, Some(Duration::from_millis(750)));
        assert_eq!(plan.frequency, None);
    }

    #[test]
    fn plan_rejects_bad_width() {
        let args = record_args(&["--width", "8"]);
        assert_eq!(plan(&args).err().unwrap().code, crate::exit::USAGE);
    }
}
