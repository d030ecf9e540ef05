//! Vision Pipeline Integration Tests
//!
//! Drives the vision node end to end with real components:
//! - Replayed JSON-lines recordings through the transform buffer
//! - Live UDP frames and transforms in, TCP stream frames out
//!
//! Run with: `cargo test --test vision_pipeline`

use std::io::{Read, Write};
use std::net::{TcpStream, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use netra_vo::core::types::{FrameResult, ImageOffset, PathPoint, RigidTransform, Stamp, TransformStamped};
use netra_vo::engine::{FrameOutcome, VisionNode, VisionNodeConfig, VisionOutputs};
use netra_vo::io::frame_source::{ChannelFrameSource, ReplayFrameSource};
use netra_vo::io::messages::{Odometry, PointStamped};
use netra_vo::io::streaming::{RecordingPublisher, StreamServer, decode_frame};
use netra_vo::io::tf::{TransformBuffer, create_shared_buffer};
use netra_vo::io::udp_receiver::{InboundMessage, ReceiverConfig, UdpReceiver, encode_datagram};
use netra_vo::threads::VisionThread;
use netra_vo::utils::RetryPolicy;

// ============================================================================
// Helpers
// ============================================================================

const POLL: Duration = Duration::from_millis(20);

fn fast_config() -> VisionNodeConfig {
    VisionNodeConfig {
        publish_rate_hz: 0.0,
        transform_wait: RetryPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
            max_attempts: Some(2),
        },
        ..Default::default()
    }
}

fn sample_frame() -> FrameResult {
    FrameResult::new(
        ImageOffset::new(0.1, 100.0, 50.0),
        5_000_000_000,
        vec![PathPoint::new(10.0, 20.0, 0.0), PathPoint::new(30.0, 40.0, 1.0)],
    )
}

fn recording(frames: &[FrameResult]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for frame in frames {
        writeln!(file, "{}", serde_json::to_string(frame).unwrap()).unwrap();
    }
    file.flush().unwrap();
    file
}

fn static_tf(parent: &str, child: &str, transform: RigidTransform) -> TransformStamped {
    TransformStamped::new(Stamp::ZERO, parent, child, transform)
}

fn read_stream_frame(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let mut len = [0u8; 4];
    stream.read_exact(&mut len).unwrap();
    let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
    stream.read_exact(&mut body).unwrap();
    let (topic, payload) = decode_frame(&body).unwrap();
    (topic.to_string(), payload.to_vec())
}

// ============================================================================
// Replay
// ============================================================================

#[test]
fn test_replay_with_identity_world_transform() {
    let mut buffer = TransformBuffer::default();
    buffer
        .set_static_transform(&static_tf("world_frame", "camera_frame", RigidTransform::identity()))
        .unwrap();

    let odometry = RecordingPublisher::<Odometry>::new();
    let points = RecordingPublisher::<PointStamped>::new();
    let mut node = VisionNode::new(
        fast_config(),
        create_shared_buffer(buffer),
        VisionOutputs {
            odometry: Box::new(odometry.clone()),
            points: Box::new(points.clone()),
        },
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();

    let file = recording(&[sample_frame()]);
    let mut source = ReplayFrameSource::open(file.path()).unwrap();
    let stats = node.run(&mut source, POLL).unwrap();

    assert_eq!(stats.frames, 1);
    assert_eq!(stats.points_published, 2);

    let odom = &odometry.messages()[0];
    assert_relative_eq!(odom.pose.pose.position.x, 0.03012, epsilon = 1e-9);
    assert_relative_eq!(odom.pose.pose.position.y, 0.47521, epsilon = 1e-9);
    assert_relative_eq!(odom.twist.twist.linear.x, 99.933, epsilon = 1e-9);
    assert_relative_eq!(odom.twist.twist.linear.y, 50.42665, epsilon = 1e-9);
    assert_relative_eq!(odom.twist.twist.angular.z, 0.1, epsilon = 1e-12);
    assert_eq!(odom.header.stamp, Stamp::new(5, 0));

    let points = points.messages();
    assert_relative_eq!(points[0].point.x, 0.009712, epsilon = 1e-12);
    assert_relative_eq!(points[0].point.y, 0.019424, epsilon = 1e-12);
    assert_relative_eq!(points[1].point.x, 0.029136, epsilon = 1e-12);
    assert_relative_eq!(points[1].point.y, 0.038848, epsilon = 1e-12);
    assert_eq!(points[1].point.z, 1.0);
}

#[test]
fn test_replay_through_frame_chain() {
    // world -> base (shifted 1 m along x) -> camera (rotated a quarter turn)
    let mut buffer = TransformBuffer::default();
    buffer
        .set_static_transform(&static_tf("world_frame", "base_link", RigidTransform::planar(1.0, 0.0, 0.0)))
        .unwrap();
    buffer
        .set_static_transform(&static_tf(
            "base_link",
            "camera_frame",
            RigidTransform::planar(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        ))
        .unwrap();

    let points = RecordingPublisher::<PointStamped>::new();
    let mut node = VisionNode::new(
        VisionNodeConfig {
            pixel_scale: 0.01,
            ..fast_config()
        },
        create_shared_buffer(buffer),
        VisionOutputs {
            odometry: Box::new(RecordingPublisher::<Odometry>::new()),
            points: Box::new(points.clone()),
        },
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();

    let frame = FrameResult::new(ImageOffset::default(), 1_000, vec![PathPoint::new(100.0, 0.0, 0.0)]);
    assert_eq!(node.process_frame(&frame).unwrap(), FrameOutcome::PointsPublished(1));

    let point = points.messages()[0].point;
    assert_relative_eq!(point.x, 1.0, epsilon = 1e-9);
    assert_relative_eq!(point.y, 1.0, epsilon = 1e-9);
}

#[test]
fn test_replay_without_transform_keeps_odometry() {
    let odometry = RecordingPublisher::<Odometry>::new();
    let points = RecordingPublisher::<PointStamped>::new();
    let mut node = VisionNode::new(
        fast_config(),
        create_shared_buffer(TransformBuffer::default()),
        VisionOutputs {
            odometry: Box::new(odometry.clone()),
            points: Box::new(points.clone()),
        },
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();

    let frames: Vec<FrameResult> = (1..=4u64)
        .map(|i| FrameResult::new(ImageOffset::new(0.0, 10.0, 0.0), i * 100_000_000, vec![PathPoint::default()]))
        .collect();
    let file = recording(&frames);
    let mut source = ReplayFrameSource::open(file.path()).unwrap();
    let stats = node.run(&mut source, POLL).unwrap();

    assert_eq!(stats.frames, 4);
    assert_eq!(stats.frames_without_transform, 4);
    assert_eq!(odometry.len(), 4);
    assert!(points.is_empty());

    let last = &odometry.messages()[3];
    assert_relative_eq!(last.pose.pose.position.x, 40.0 * 0.0009712 - 0.067, epsilon = 1e-9);
    assert_eq!(last.header.seq, 3);
}

#[test]
fn test_replay_stops_on_corrupt_line() {
    let mut file = recording(&[sample_frame()]);
    writeln!(file, "not json").unwrap();
    file.flush().unwrap();

    let odometry = RecordingPublisher::<Odometry>::new();
    let mut node = VisionNode::new(
        fast_config(),
        create_shared_buffer(TransformBuffer::default()),
        VisionOutputs {
            odometry: Box::new(odometry.clone()),
            points: Box::new(RecordingPublisher::<PointStamped>::new()),
        },
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();

    let mut source = ReplayFrameSource::open(file.path()).unwrap();
    let err = node.run(&mut source, POLL).unwrap_err();
    assert!(err.to_string().contains("line 2"));
    assert_eq!(odometry.len(), 1);
}

#[test]
fn test_unlimited_wait_ends_on_shutdown() {
    let running = Arc::new(AtomicBool::new(true));
    let odometry = RecordingPublisher::<Odometry>::new();
    let points = RecordingPublisher::<PointStamped>::new();
    let node = VisionNode::new(
        VisionNodeConfig {
            transform_wait: RetryPolicy {
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                multiplier: 2.0,
                max_attempts: None,
            },
            ..fast_config()
        },
        create_shared_buffer(TransformBuffer::default()),
        VisionOutputs {
            odometry: Box::new(odometry.clone()),
            points: Box::new(points.clone()),
        },
        Arc::clone(&running),
    )
    .unwrap();

    let (tx, rx) = crossbeam_channel::bounded(4);
    tx.send(sample_frame()).unwrap();
    tx.send(sample_frame()).unwrap();
    let vision = VisionThread::spawn(node, ChannelFrameSource::new(rx), POLL, Arc::clone(&running));

    // Odometry goes out before the node starts waiting for the transform
    let deadline = Instant::now() + Duration::from_secs(2);
    while odometry.is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(odometry.len(), 1);

    // Still waiting on the first frame, no matter how long
    thread::sleep(Duration::from_millis(150));
    assert_eq!(odometry.len(), 1);
    assert!(running.load(Ordering::SeqCst));

    let stopped = Instant::now();
    running.store(false, Ordering::SeqCst);
    let stats = vision.join().unwrap().unwrap();
    assert!(stopped.elapsed() < Duration::from_secs(1));

    assert_eq!(stats.frames, 1);
    assert_eq!(stats.frames_without_transform, 0);
    assert!(points.is_empty());
}

// ============================================================================
// Live: UDP in, TCP out
// ============================================================================

#[test]
fn test_udp_to_tcp_stream() {
    let running = Arc::new(AtomicBool::new(true));
    let transforms = create_shared_buffer(TransformBuffer::default());

    let mut server = StreamServer::bind("127.0.0.1:0").unwrap();
    let odometry = server.advertise::<Odometry>("/vo", 50);
    let points = server.advertise::<PointStamped>("/points", 10);
    let stream = server.spawn().unwrap();

    let (receiver, frames) = UdpReceiver::new(
        ReceiverConfig {
            bind_addr: "127.0.0.1:0".to_string(),
        },
        Arc::clone(&transforms),
        Arc::clone(&running),
    )
    .unwrap();
    let udp_addr = receiver.local_addr().unwrap();
    let receiver_thread = thread::spawn(move || receiver.run());

    let node = VisionNode::new(
        fast_config(),
        Arc::clone(&transforms),
        VisionOutputs {
            odometry: Box::new(odometry),
            points: Box::new(points),
        },
        Arc::clone(&running),
    )
    .unwrap();
    let vision = VisionThread::spawn(node, ChannelFrameSource::new(frames), POLL, Arc::clone(&running));

    let mut client = TcpStream::connect(stream.local_addr()).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    thread::sleep(Duration::from_millis(100));

    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    let tf = static_tf("world_frame", "camera_frame", RigidTransform::identity());
    sender
        .send_to(&encode_datagram(&InboundMessage::StaticTransform(tf)).unwrap(), udp_addr)
        .unwrap();

    // Wait for the receiver to apply the transform before the frame arrives
    let deadline = Instant::now() + Duration::from_secs(2);
    while !transforms.read().has_frame("camera_frame") && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    sender
        .send_to(&encode_datagram(&InboundMessage::Frame(sample_frame())).unwrap(), udp_addr)
        .unwrap();

    let mut odom = None;
    let mut world_points = Vec::new();
    for _ in 0..3 {
        let (topic, payload) = read_stream_frame(&mut client);
        match topic.as_str() {
            "/vo" => odom = Some(serde_json::from_slice::<Odometry>(&payload).unwrap()),
            "/points" => world_points.push(serde_json::from_slice::<PointStamped>(&payload).unwrap()),
            other => panic!("unexpected topic {}", other),
        }
    }

    running.store(false, Ordering::SeqCst);
    let stats = vision.join().unwrap().unwrap();
    receiver_thread.join().unwrap();

    assert_eq!(stats.frames, 1);
    let odom = odom.unwrap();
    assert_eq!(odom.header.frame_id, "world_frame");
    assert_relative_eq!(odom.pose.pose.position.x, 0.03012, epsilon = 1e-9);
    assert_eq!(world_points.len(), 2);
    assert_relative_eq!(world_points[1].point.y, 0.038848, epsilon = 1e-12);
    assert_eq!(world_points[0].header.stamp, Stamp::new(5, 0));
}
