//! Replays recorded scanner output through the tracker.
//!
//! The input holds one JSON `Frame` per line. A producer thread posts frames
//! into a single-slot mailbox at the requested rate; the acquisition loop
//! takes the newest one, runs the tracker and writes presence and movement
//! data to SQLite.

use anyhow::Context;
use carrier_track::db::SqlitePresenceStore;
use carrier_track::mailbox::Mailbox;
use carrier_track::snapshot::JsonFileSink;
use carrier_track::{CarrierTracker, Config, Frame};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Parser, Debug)]
#[command(about = "Replay recorded detections through the carrier tracker")]
struct Opts {
    /// JSON lines file, one frame per line
    input: PathBuf,

    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Frames per second to replay at
    #[arg(long, default_value_t = 17.0)]
    fps: f64,

    /// Goods labels to register when the inventory is empty
    #[arg(long)]
    register: Vec<String>,
}

fn spawn_producer(
    input: PathBuf,
    fps: f64,
    mailbox: Arc<Mailbox<Frame>>,
    done: Arc<AtomicBool>,
) -> anyhow::Result<thread::JoinHandle<()>> {
    let file = std::fs::File::open(&input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let pause = std::time::Duration::from_secs_f64(1.0 / fps.max(0.1));

    let handle = thread::Builder::new()
        .name("frame-source".into())
        .spawn(move || {
            for (lineno, line) in std::io::BufReader::new(file).lines().enumerate() {
                let line = match line {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => line,
                    Err(err) => {
                        log::error!("Read error: {}", err);
                        break;
                    }
                };

                match serde_json::from_str::<Frame>(&line) {
                    Ok(frame) => mailbox.post(frame),
                    Err(err) => log::warn!("Skipping line {}: {}", lineno + 1, err),
                }

                thread::sleep(pause);
            }

            done.store(true, Ordering::SeqCst);
        })?;

    Ok(handle)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let config = Config::load(&opts.config)?;
    let store = Arc::new(SqlitePresenceStore::open(&config.database_path)?);

    for goods in &opts.register {
        let id = store.register_carrier(goods)?;
        log::info!("Registered carrier #{} ({})", id, goods);
    }

    let sink = JsonFileSink::new(&config.snapshot_path)?;
    let mut tracker = CarrierTracker::new(config.tracker.clone(), Box::new(Arc::clone(&store)))
        .with_sink(Box::new(sink));

    let mailbox = Arc::new(Mailbox::new());
    let done = Arc::new(AtomicBool::new(false));
    let producer = spawn_producer(
        opts.input.clone(),
        opts.fps,
        Arc::clone(&mailbox),
        Arc::clone(&done),
    )?;

    let timeout = std::time::Duration::from_secs_f64(config.frame_timeout);
    let log_interval = Duration::milliseconds((config.movement_log_interval * 1000.0) as i64);
    let mut last_log: Option<DateTime<Utc>> = None;
    let mut frames = 0u64;

    loop {
        let frame = match mailbox.take_timeout(timeout) {
            Some(frame) => frame,
            None if done.load(Ordering::SeqCst) => break,
            None => continue,
        };
        frames += 1;

        let now = frame.timestamp;
        let should_log = last_log.map_or(true, |at| now - at >= log_interval);
        let live = tracker.update(&frame);

        if should_log {
            for entity in live.values().filter(|e| e.active) {
                let foot = entity.bbox.foot_point();
                if let Err(err) =
                    store.log_movement(entity.id, foot.x as i32, foot.y as i32, now)
                {
                    log::warn!("Movement of #{} not logged: {}", entity.id, err);
                }
            }
            last_log = Some(now);
        }
    }

    if producer.join().is_err() {
        log::error!("Frame source thread panicked");
    }

    log::info!(
        "Processed {} frames, dropped {}, {} carriers live, {} in history",
        frames,
        mailbox.dropped(),
        tracker.live().len(),
        tracker.history().len()
    );

    Ok(())
}
