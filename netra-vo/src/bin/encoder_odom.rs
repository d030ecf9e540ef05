//! Wheel encoder odometry publisher.
//!
//! Replays a recorded encoder log through the differential drive model and
//! streams one odometry record per sample on the configured topic.
//!
//! # Usage
//!
//! ```bash
//! encoder-odom --log encoders.json
//! encoder-odom --config netra-vo.toml
//! ```

use std::env;
use std::io::Write;
use std::path::Path;

use netra_vo::config::Config;
use netra_vo::engine::EncoderNode;
use netra_vo::io::encoder_log::EncoderLog;
use netra_vo::io::messages::Odometry;
use netra_vo::io::streaming::StreamServer;
use netra_vo::utils::setup_ctrl_c_handler;

struct Args {
    config_path: Option<String>,
    log_path: Option<String>,
}

fn main() {
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

    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut result = Args {
        config_path: None,
        log_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                result.config_path = Some(args.get(i).ok_or("--config needs a file")?.clone());
            }
            "--log" | "-l" => {
                i += 1;
                result.log_path = Some(args.get(i).ok_or("--log needs a file")?.clone());
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(format!("Unknown argument: {}", args[i])),
        }
        i += 1;
    }

    Ok(result)
}

fn print_usage() {
    eprintln!(
        r#"encoder-odom - wheel encoder odometry publisher

USAGE:
    encoder-odom [OPTIONS]

OPTIONS:
    -c, --config <FILE>     Configuration file (default: netra-vo.toml)
    -l, --log <FILE>        Encoder log, overrides [encoder] log_file
    -h, --help              Print help information

The log is a JSON array of four equal-length rows: file names, sample
times in milliseconds, right wheel ticks, left wheel ticks."#
    );
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default(args.config_path.as_deref().map(Path::new))?;
    let log_path = args
        .log_path
        .or_else(|| config.encoder.log_file.clone())
        .ok_or("No encoder log given (use --log or [encoder] log_file)")?;

    let log = EncoderLog::load(&log_path)?;
    log::info!("Loaded {} encoder samples from {}", log.len(), log_path);

    let running = setup_ctrl_c_handler()?;

    let mut server = StreamServer::bind(&config.output.bind_address)?;
    let publisher = server.advertise::<Odometry>(&config.encoder.topic, config.encoder.queue);
    let stream = server.spawn()?;

    let node_config = config.encoder_node_config();
    log::info!(
        "Publishing {} ({} -> {}) on {}",
        config.encoder.topic,
        node_config.child_frame_id,
        node_config.frame_id,
        stream.local_addr()
    );

    let mut node = EncoderNode::new(node_config, Box::new(publisher), running);
    node.run(&log);

    stream.stop();
    Ok(())
}
