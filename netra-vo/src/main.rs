//! netra-vo - visual odometry daemon
//!
//! Threads:
//! - **udp-receiver**: frames and world←camera transforms from the vision pipeline
//! - **vision**: pose integration, odometry and trajectory point publishing
//! - **tcp-stream**: fans published records out to connected clients
//!
//! # Usage
//!
//! ```bash
//! # With default config (./netra-vo.toml, /etc/netra-vo.toml, built-in)
//! cargo run --release --bin netra-vo
//!
//! # With custom config file
//! cargo run --release --bin netra-vo -- --config netra-vo.toml
//! ```

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use netra_vo::config::{Config, SourceKind};
use netra_vo::engine::{VisionNode, VisionOutputs};
use netra_vo::io::frame_source::{ChannelFrameSource, ReplayFrameSource};
use netra_vo::io::messages::{Odometry, PointStamped};
use netra_vo::io::streaming::StreamServer;
use netra_vo::io::tf::{SharedTransformBuffer, TransformBuffer, create_shared_buffer};
use netra_vo::io::udp_receiver::{ReceiverConfig, UdpReceiver};
use netra_vo::threads::VisionThread;
use netra_vo::utils::setup_ctrl_c_handler;

// ============================================================================
// CLI Arguments
// ============================================================================

struct Args {
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args { config_path: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("netra-vo - visual odometry publisher");
    println!();
    println!("USAGE:");
    println!("    netra-vo [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>     Configuration file (default: netra-vo.toml)");
    println!("    -h, --help              Print help information");
    println!();
    println!("CONFIGURATION:");
    println!("    - [source] kind: \"udp\" (live) or \"replay\" (JSON-lines recording)");
    println!("    - [frames] world_frame, camera_frame: transform lookup frames");
    println!("    - [output] bind_address: TCP stream address");
    println!("    - [tf] static_transforms: transforms loaded at startup");
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    let config = match Config::load_or_default(args.config_path.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    log::info!("netra-vo starting");
    log::info!(
        "  Frames: {} <- {} (child {})",
        config.frames.world_frame,
        config.frames.camera_frame,
        config.vision.child_frame_id
    );
    log::info!("  Pixel scale: {} m/px", config.vision.pixel_scale);
    log::info!("  Output: {}", config.output.bind_address);

    let running = match setup_ctrl_c_handler() {
        Ok(running) => running,
        Err(e) => {
            log::error!("Error setting Ctrl-C handler: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_daemon(&config, running.clone()) {
        log::error!("Daemon error: {}", e);
        std::process::exit(1);
    }

    log::info!("netra-vo shutdown complete");
}

// ============================================================================
// Daemon
// ============================================================================

fn run_daemon(config: &Config, running: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Transform buffer, seeded with configured static transforms
    let transforms = create_shared_buffer(TransformBuffer::new(config.tf.cache_duration()));
    seed_static_transforms(config, &transforms);

    // 2. Output stream
    let mut server = StreamServer::bind(&config.output.bind_address)?;
    let odometry = server.advertise::<Odometry>(&config.output.odometry_topic, config.output.odometry_queue);
    let points = server.advertise::<PointStamped>(&config.output.points_topic, config.output.points_queue);
    let stream = server.spawn()?;
    log::info!("  Streaming {} and {}", odometry.topic(), points.topic());

    // 3. Vision node
    let node = VisionNode::new(
        config.vision_node_config(),
        Arc::clone(&transforms),
        VisionOutputs {
            odometry: Box::new(odometry),
            points: Box::new(points),
        },
        Arc::clone(&running),
    )?;
    let poll_timeout = config.frame_poll_timeout();

    // 4. Frame source and vision thread
    let mut receiver_handle = None;
    let vision = match config.source.kind {
        SourceKind::Udp => {
            let (receiver, frames) = UdpReceiver::new(
                ReceiverConfig {
                    bind_addr: config.source.udp_bind.clone(),
                },
                Arc::clone(&transforms),
                Arc::clone(&running),
            )?;
            receiver_handle = Some(
                thread::Builder::new()
                    .name("udp-receiver".into())
                    .spawn(move || receiver.run())
                    .expect("Failed to spawn UDP receiver thread"),
            );
            VisionThread::spawn(node, ChannelFrameSource::new(frames), poll_timeout, Arc::clone(&running))
        }
        SourceKind::Replay => {
            let path = config
                .source
                .replay_file
                .as_deref()
                .ok_or("source.kind = \"replay\" requires source.replay_file")?;
            log::info!("  Input: replay {} at {}x", path, config.source.replay_speed);
            let source = ReplayFrameSource::open(path)?.with_pacing(config.source.replay_speed);
            VisionThread::spawn(node, source, poll_timeout, Arc::clone(&running))
        }
    };

    // 5. Wait for the vision thread, then bring the rest down
    let result = match vision.join() {
        Ok(result) => result,
        Err(_) => {
            log::error!("Vision thread panicked");
            Ok(Default::default())
        }
    };
    running.store(false, Ordering::SeqCst);

    if let Some(handle) = receiver_handle
        && handle.join().is_err()
    {
        log::error!("UDP receiver thread panicked");
    }
    stream.stop();
    drop(stream);

    let stats = result?;
    log::info!(
        "Published {} odometry records and {} points ({} publish errors)",
        stats.odometry_published,
        stats.points_published,
        stats.publish_errors
    );
    Ok(())
}

fn seed_static_transforms(config: &Config, transforms: &SharedTransformBuffer) {
    let mut buffer = transforms.write();
    for entry in &config.tf.static_transforms {
        match buffer.set_static_transform(&entry.to_stamped()) {
            Ok(()) => log::info!("  Static transform {} -> {}", entry.child, entry.parent),
            Err(e) => log::warn!(
                "  Ignoring static transform {} -> {}: {}",
                entry.child,
                entry.parent,
                e
            ),
        }
    }
}
