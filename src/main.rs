mod viewer;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam_channel::Sender;
use eframe::{egui, NativeOptions};
use log::{error, info, warn};

use spectrum_waterfall::sweep_csv::read_sweeps;
use spectrum_waterfall::synth::SyntheticSweep;
use spectrum_waterfall::{SweepScan, Waterfall, WaterfallConfig};
use viewer::{DrawingOffsets, WaterfallApp};

/// Scans buffered between the source thread and the GUI.
const SCAN_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Generated tones run through an FFT
    Synthetic,
    /// Text output of hackrf_sweep
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "spectrum_waterfall", about = "Scrolling waterfall view of a spectrum feed")]
struct Args {
    /// YAML configuration, created with defaults if missing
    #[arg(long, default_value = "waterfall.yaml")]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = Source::Synthetic)]
    source: Source,

    /// hackrf_sweep output file for the csv source, `-` for stdin
    #[arg(long, default_value = "-")]
    input: String,

    /// Scans per second to feed; 0 reads as fast as the source allows
    #[arg(long, default_value_t = 20.0)]
    rate: f64,

    /// Band of the synthetic source
    #[arg(long, default_value_t = 88e6)]
    start_hz: f64,
    #[arg(long, default_value_t = 108e6)]
    stop_hz: f64,

    /// Left edge of the waterfall inside the window, in points
    #[arg(long, default_value_t = 0.0)]
    chart_x_offset: f32,
    /// Width of the waterfall, in points; fills the window if unset
    #[arg(long)]
    chart_width: Option<f32>,

    #[arg(long)]
    enable_logs: bool,
}

fn main() {
    let args = Args::parse();

    if args.enable_logs {
        // Don't override RUST_LOG if it's already set
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", "spectrum_waterfall=info");
        }
        env_logger::init();
    }

    if let Err(e) = run(args) {
        error!("Application encountered an error: {:?}", e);
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = WaterfallConfig::load(&args.config)?;
    let waterfall = Waterfall::new(&config)?;

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let (scan_tx, scan_rx) = crossbeam_channel::bounded(SCAN_QUEUE_DEPTH);
    let source_thread = spawn_source(&args, scan_tx, Arc::clone(&shutdown_flag))?;

    info!("Starting GUI...");
    let offsets = DrawingOffsets {
        x_offset: args.chart_x_offset,
        width: args.chart_width,
    };
    let app = WaterfallApp::new(waterfall, scan_rx, offsets);
    let native_options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1024.0, 440.0]),
        vsync: true,
        ..Default::default()
    };

    let gui_result = eframe::run_native(
        "Spectrum Waterfall",
        native_options,
        Box::new(|_cc| Box::new(app)),
    );

    info!("Setting shutdown flag...");
    shutdown_flag.store(true, Ordering::SeqCst);

    // A read blocked on stdin cannot notice the flag; leave it to process exit
    if reads_stdin(&args) && !source_thread.is_finished() {
        warn!("Source thread still waiting on stdin at exit");
    } else if source_thread.join().is_ok() {
        info!("Source thread terminated successfully");
    } else {
        warn!("Source thread may not have terminated cleanly");
    }

    gui_result.map_err(|e| anyhow!("GUI error: {}", e))
}

fn spawn_source(
    args: &Args,
    scan_tx: Sender<SweepScan>,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let interval = pacing_interval(args.rate);

    let handle = match args.source {
        Source::Synthetic => {
            let synth = SyntheticSweep::demo(args.start_hz, args.stop_hz)?;
            info!("Synthetic source with {} bins per scan", synth.bin_count());
            thread::Builder::new()
                .name("synthetic-source".into())
                .spawn(move || run_synthetic(synth, scan_tx, shutdown_flag, interval))?
        }
        Source::Csv => {
            let reader: Box<dyn BufRead + Send> = if args.input == "-" {
                info!("Reading hackrf_sweep output from stdin");
                Box::new(BufReader::new(io::stdin()))
            } else {
                let file = File::open(&args.input)
                    .with_context(|| format!("Failed to open sweep input {}", args.input))?;
                info!("Reading hackrf_sweep output from {}", args.input);
                Box::new(BufReader::new(file))
            };
            thread::Builder::new()
                .name("csv-source".into())
                .spawn(move || {
                    let result = read_sweeps(reader, |scan| {
                        if shutdown_flag.load(Ordering::Relaxed) || scan_tx.send(scan).is_err() {
                            return false;
                        }
                        if let Some(interval) = interval {
                            thread::sleep(interval);
                        }
                        true
                    });
                    if let Err(e) = result {
                        error!("Sweep input failed: {:?}", e);
                    }
                    info!("CSV source finished");
                })?
        }
    };
    Ok(handle)
}

/// Feeds generated scans until shutdown is flagged or the receiver goes away.
fn run_synthetic(
    mut synth: SyntheticSweep,
    scan_tx: Sender<SweepScan>,
    shutdown_flag: Arc<AtomicBool>,
    interval: Option<Duration>,
) {
    while !shutdown_flag.load(Ordering::Relaxed) {
        match synth.next_scan() {
            Ok(scan) => {
                if scan_tx.send(scan).is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Synthetic source failed: {:?}", e);
                break;
            }
        }
        if let Some(interval) = interval {
            thread::sleep(interval);
        }
    }
    info!("Synthetic source shutting down");
}

fn reads_stdin(args: &Args) -> bool {
    args.source == Source::Csv && args.input == "-"
}

fn pacing_interval(rate: f64) -> Option<Duration> {
    if rate > 0.0 && rate.is_finite() {
        Some(Duration::from_secs_f64(1.0 / rate))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectrum_waterfall::synth::Tone;

    fn small_synth() -> SyntheticSweep {
        SyntheticSweep::new(0.0, 1000.0, 16, vec![Tone::fixed(0.5, 1.0)]).unwrap()
    }

    #[test]
    fn synthetic_source_stops_on_shutdown_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::bounded(SCAN_QUEUE_DEPTH);
        let worker_flag = Arc::clone(&flag);
        let handle = thread::spawn(move || {
            run_synthetic(small_synth(), tx, worker_flag, Some(Duration::from_millis(1)))
        });

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        flag.store(true, Ordering::SeqCst);
        // Keep draining so a full queue cannot hold the sender
        while rx.recv_timeout(Duration::from_millis(50)).is_ok() {}
        handle.join().unwrap();
    }

    #[test]
    fn synthetic_source_stops_when_receiver_drops() {
        let flag = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::bounded(1);
        let handle = thread::spawn(move || run_synthetic(small_synth(), tx, flag, None));

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        drop(rx);
        handle.join().unwrap();
    }

    #[test]
    fn only_csv_from_stdin_counts_as_blocking() {
        let args = Args::parse_from(["spectrum_waterfall", "--source", "csv"]);
        assert!(reads_stdin(&args));

        let args = Args::parse_from(["spectrum_waterfall", "--source", "csv", "--input", "sweep.csv"]);
        assert!(!reads_stdin(&args));

        let args = Args::parse_from(["spectrum_waterfall"]);
        assert!(!reads_stdin(&args));
    }
}
