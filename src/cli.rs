use std::future::Future;
use std::path::PathBuf;
use std::pin::{pin, Pin};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;

use crate::arguments::build_arguments;
use crate::metrics;
use crate::model::{FrameImporter, RunConfig, ScoreFile, ScoreMethod, Status, StatusRecord};
use crate::orchestrator::ScoreRun;

/// Retry interval for a timeout-triggered cancel that fired before the run
/// was cancelable.
const CANCEL_RETRY: std::time::Duration = std::time::Duration::from_millis(500);

#[derive(Debug, Parser, Clone)]
#[command(
    name = "scorerun",
    version,
    about = "Run an external frame-scoring tool and stream its progress"
)]
pub struct Cli {
    /// Source (reference) video file
    pub source: PathBuf,

    /// Encoded video file to score against the source
    pub encoded: PathBuf,

    /// Output path for the JSON score file
    pub scores: PathBuf,

    /// Entry point of the scoring tool
    #[arg(long)]
    pub tool: PathBuf,

    /// Interpreter or binary that executes the tool
    #[arg(long, default_value = "python3")]
    pub runner: PathBuf,

    /// Scoring method (v1, v2, v2_zig)
    #[arg(long)]
    pub method: Option<ScoreMethod>,

    /// Frame importer for both inputs (dgdecnv, bestsource, lsmash, ffms2)
    #[arg(long)]
    pub importer: Option<FrameImporter>,

    /// Frame importer for the source file only
    #[arg(long)]
    pub source_importer: Option<FrameImporter>,

    /// Frame importer for the encoded file only
    #[arg(long)]
    pub encoded_importer: Option<FrameImporter>,

    /// Worker threads for the scoring tool
    #[arg(long)]
    pub threads: Option<u32>,

    /// Scale frames to this width before scoring
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Scale frames to this height before scoring
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Score every Nth frame only
    #[arg(long)]
    pub every: Option<u32>,

    /// Ask the tool to print its own progress output
    #[arg(long)]
    pub progress: bool,

    /// Loopback port for the progress stream
    #[arg(long, default_value_t = RunConfig::DEFAULT_PORT)]
    pub port: u16,

    /// Print the final scores as JSON instead of a text summary
    #[arg(long)]
    pub json: bool,

    /// Suppress per-frame progress lines on stderr
    #[arg(long)]
    pub quiet: bool,

    /// Cancel the run if it has not finished within this duration
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Print the command that would run, then exit
    #[arg(long)]
    pub print_command: bool,
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        runner: args.runner.clone(),
        tool: args.tool.clone(),
        source: args.source.clone(),
        encoded: args.encoded.clone(),
        scores_output: args.scores.clone(),
        method: args.method,
        importer: args.importer,
        source_importer: args.source_importer,
        encoded_importer: args.encoded_importer,
        threads: args.threads,
        dimensions: args.width.zip(args.height),
        every: args.every,
        progress: args.progress,
        port: args.port,
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);

    if args.print_command {
        let (_, display) = build_arguments(&cfg);
        println!("{} {}", cfg.runner.display(), display.join(" "));
        return Ok(());
    }

    let run = Arc::new(ScoreRun::new(cfg).context("invalid run configuration")?);

    // Bridge synchronous status notifications into an async consumer.
    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<StatusRecord>();
    let subscription = run.subscribe(move |record| {
        let _ = status_tx.send(record.clone());
    });

    let printer = if args.quiet {
        None
    } else {
        let run = run.clone();
        Some(tokio::spawn(async move {
            while let Some(record) = status_rx.recv().await {
                print_status(&run, &record);
            }
        }))
    };

    let handle = run.start().context("failed to start scoring run")?;

    let mut deadline: Pin<Box<dyn Future<Output = ()> + Send>> = match args.timeout {
        Some(d) => Box::pin(tokio::time::sleep(d.into())),
        None => Box::pin(futures::future::pending()),
    };
    let mut timed_out = false;
    let mut wait = pin!(handle.wait());
    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome,
            _ = &mut deadline => {
                if !timed_out {
                    timed_out = true;
                    eprintln!("timeout reached, canceling");
                }
                // The cancel can race the spawn (or a not-yet-cancelable
                // state); keep re-arming until the run settles.
                run.cancel();
                deadline = Box::pin(tokio::time::sleep(CANCEL_RETRY));
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("interrupted, canceling");
                run.cancel();
            }
        }
    };

    // Dropping the subscription closes the channel and lets the printer end.
    run.unsubscribe(subscription);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let scores = outcome.context("scoring run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ScoreFile { scores })?);
    } else {
        println!("scored {} frames", scores.len());
        if let Some((mean, median, p25, p75)) = metrics::compute_metrics(&scores) {
            println!("mean:   {mean:.3}");
            println!("median: {median:.3}");
            println!("p25:    {p25:.3}");
            println!("p75:    {p75:.3}");
        }
    }
    Ok(())
}

fn print_status(run: &ScoreRun, record: &StatusRecord) {
    match record.status {
        Status::Running => match (record.frame, record.score) {
            (Some(frame), Some(score)) => {
                let total = run.total_frames();
                let eta = run.eta_seconds();
                if eta.is_finite() {
                    eprintln!("frame {frame}/{total}: {score:.3} (eta {eta:.0}s)");
                } else {
                    eprintln!("frame {frame}/{total}: {score:.3}");
                }
            }
            _ => eprintln!("== running =="),
        },
        Status::Error => match &record.error {
            Some(error) => eprintln!("error: {error}"),
            None => eprintln!("== error =="),
        },
        other => eprintln!("== {other} =="),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_config_maps_every_field() {
        let args = Cli::try_parse_from([
            "scorerun",
            "a.mkv",
            "b.mkv",
            "s.json",
            "--tool",
            "score.py",
            "--method",
            "v2",
            "--importer",
            "ffms2",
            "--threads",
            "4",
            "--width",
            "1280",
            "--height",
            "720",
            "--every",
            "3",
            "--progress",
            "--port",
            "4000",
        ])
        .unwrap();
        let cfg = build_config(&args);
        assert_eq!(cfg.source, PathBuf::from("a.mkv"));
        assert_eq!(cfg.encoded, PathBuf::from("b.mkv"));
        assert_eq!(cfg.scores_output, PathBuf::from("s.json"));
        assert_eq!(cfg.tool, PathBuf::from("score.py"));
        assert_eq!(cfg.runner, PathBuf::from("python3"));
        assert_eq!(cfg.method, Some(ScoreMethod::V2));
        assert_eq!(cfg.importer, Some(FrameImporter::Ffms2));
        assert_eq!(cfg.threads, Some(4));
        assert_eq!(cfg.dimensions, Some((1280, 720)));
        assert_eq!(cfg.every, Some(3));
        assert!(cfg.progress);
        assert_eq!(cfg.port, 4000);
    }

    #[test]
    fn width_requires_height() {
        let res = Cli::try_parse_from([
            "scorerun", "a.mkv", "b.mkv", "s.json", "--tool", "t.py", "--width", "1280",
        ]);
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn timeout_cancels_even_when_it_fires_before_the_run_is_cancelable() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = dir.path().join("tool.sh");
        std::fs::write(&tool, "sleep 5\n").unwrap();
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        // A 1 ms deadline fires before the child is spawned; the retry loop
        // must land the cancel anyway instead of disarming.
        let args = Cli {
            source: "a.mkv".into(),
            encoded: "b.mkv".into(),
            scores: dir.path().join("scores.json"),
            tool,
            runner: "/bin/sh".into(),
            method: None,
            importer: None,
            source_importer: None,
            encoded_importer: None,
            threads: None,
            width: None,
            height: None,
            every: None,
            progress: false,
            port,
            json: false,
            quiet: true,
            timeout: Some("1ms".parse().unwrap()),
            print_command: false,
        };

        let started = std::time::Instant::now();
        let res = run(args).await;
        assert!(res.is_err());
        assert!(
            started.elapsed() < std::time::Duration::from_secs(4),
            "run was not canceled before the tool finished"
        );
    }

    #[test]
    fn port_defaults_to_3000() {
        let args =
            Cli::try_parse_from(["scorerun", "a.mkv", "b.mkv", "s.json", "--tool", "t.py"]).unwrap();
        assert_eq!(build_config(&args).port, RunConfig::DEFAULT_PORT);
    }
}
