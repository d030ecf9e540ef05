//! TCP stream server for published records.
//!
//! A dedicated thread owns the listener and the connected clients. Topic
//! publishers encode messages on the caller's thread and hand the finished
//! frames over bounded crossbeam channels with `try_send`, so publishing
//! never blocks the vision loop. A full topic queue drops the message.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use log::{debug, error, info, warn};
use std::io::Write;
use std::marker::PhantomData;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{Publisher, PublisherError, Result, encode_frame};

/// Frames forwarded per topic per loop iteration.
const MAX_BATCH: usize = 50;

/// Clients that cannot take a frame within this time are dropped.
const CLIENT_WRITE_TIMEOUT: Duration = Duration::from_millis(200);

struct Topic {
    name: String,
    rx: Receiver<Vec<u8>>,
    sent: u64,
}

/// Stream server under construction: bound, topics being advertised.
pub struct StreamServer {
    listener: TcpListener,
    topics: Vec<Topic>,
}

impl StreamServer {
    /// Bind the listener (e.g. "0.0.0.0:5557").
    pub fn bind(bind_address: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        info!("Stream server bound to {}", listener.local_addr()?);
        Ok(Self {
            listener,
            topics: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Create a publisher for `topic` holding up to `queue_size` pending frames.
    pub fn advertise<M: serde::Serialize>(&mut self, topic: &str, queue_size: usize) -> TopicPublisher<M> {
        let (tx, rx) = bounded(queue_size.max(1));
        self.topics.push(Topic {
            name: topic.to_string(),
            rx,
            sent: 0,
        });
        debug!("Advertised {} (queue {})", topic, queue_size);
        TopicPublisher {
            topic: topic.to_string(),
            tx,
            buffer: Vec::with_capacity(512),
            _marker: PhantomData,
        }
    }

    /// Start the server thread.
    pub fn spawn(self) -> Result<StreamHandle> {
        let local_addr = self.listener.local_addr()?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let thread = thread::Builder::new()
            .name("tcp-stream".to_string())
            .spawn(move || self.run(shutdown_clone))?;

        info!("Stream server started on {}", local_addr);
        Ok(StreamHandle {
            local_addr,
            shutdown,
            thread: Some(thread),
        })
    }

    fn run(mut self, shutdown: Arc<AtomicBool>) {
        let mut clients: Vec<TcpStream> = Vec::new();

        while !shutdown.load(Ordering::Relaxed) {
            self.accept_clients(&mut clients);

            let mut idle = true;
            let mut all_disconnected = !self.topics.is_empty();
            for topic in &mut self.topics {
                for _ in 0..MAX_BATCH {
                    match topic.rx.try_recv() {
                        Ok(frame) => {
                            idle = false;
                            all_disconnected = false;
                            broadcast(&mut clients, &frame);
                            topic.sent += 1;
                        }
                        Err(TryRecvError::Empty) => {
                            all_disconnected = false;
                            break;
                        }
                        Err(TryRecvError::Disconnected) => break,
                    }
                }
            }

            if all_disconnected {
                info!("All topic publishers dropped");
                break;
            }
            if idle {
                thread::sleep(Duration::from_millis(10));
            }
        }

        for topic in &self.topics {
            info!("Stream server: {} frames sent on {}", topic.sent, topic.name);
        }
        info!("Stream server exiting");
    }

    fn accept_clients(&self, clients: &mut Vec<TcpStream>) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let configured = stream
                        .set_nonblocking(false)
                        .and_then(|_| stream.set_write_timeout(Some(CLIENT_WRITE_TIMEOUT)))
                        .and_then(|_| stream.set_nodelay(true));
                    match configured {
                        Ok(()) => {
                            info!("New client connected: {}", addr);
                            clients.push(stream);
                        }
                        Err(e) => warn!("Failed to configure client {}: {}", addr, e),
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    error!("Error accepting client connection: {}", e);
                    return;
                }
            }
        }
    }
}

/// Send a frame to every client, dropping the ones that fail.
fn broadcast(clients: &mut Vec<TcpStream>, frame: &[u8]) {
    clients.retain_mut(|client| match client.write_all(frame) {
        Ok(_) => true,
        Err(e) => {
            if let Ok(addr) = client.peer_addr() {
                debug!("Client {} disconnected: {}", addr, e);
            }
            false
        }
    });
}

/// Running stream server. Stops and joins the thread on drop.
pub struct StreamHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Publisher for one topic of a [`StreamServer`].
pub struct TopicPublisher<M> {
    topic: String,
    tx: Sender<Vec<u8>>,
    buffer: Vec<u8>,
    _marker: PhantomData<fn(&M)>,
}

impl<M> TopicPublisher<M> {
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl<M: serde::Serialize> Publisher<M> for TopicPublisher<M> {
    fn publish(&mut self, msg: &M) -> Result<()> {
        encode_frame(&self.topic, msg, &mut self.buffer)?;
        match self.tx.try_send(self.buffer.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(PublisherError::QueueFull(self.topic.clone())),
            Err(TrySendError::Disconnected(_)) => Err(PublisherError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::messages::{Header, Point, PointStamped};
    use crate::io::streaming::decode_frame;
    use std::io::Read;

    fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
        let mut len = [0u8; 4];
        stream.read_exact(&mut len).unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
        stream.read_exact(&mut body).unwrap();
        body
    }

    #[test]
    fn test_loopback_delivery() {
        let mut server = StreamServer::bind("127.0.0.1:0").unwrap();
        let mut points = server.advertise::<PointStamped>("/points", 10);
        let handle = server.spawn().unwrap();

        let mut client = TcpStream::connect(handle.local_addr()).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let msg = PointStamped {
            header: Header::new(0, Default::default(), "world_frame"),
            point: Point::new(0.5, 1.5, 1.0),
        };

        // The server accepts on its own schedule; publish until the client sees a frame
        let mut received = None;
        for _ in 0..100 {
            let _ = points.publish(&msg);
            let mut peek = [0u8; 1];
            client.set_nonblocking(true).unwrap();
            let ready = client.peek(&mut peek).is_ok();
            client.set_nonblocking(false).unwrap();
            if ready {
                received = Some(read_frame(&mut client));
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }

        let body = received.expect("no frame received");
        let (topic, payload) = decode_frame(&body).unwrap();
        assert_eq!(topic, "/points");
        let decoded: PointStamped = serde_json::from_slice(payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_queue_full_reported() {
        let mut server = StreamServer::bind("127.0.0.1:0").unwrap();
        let mut publisher = server.advertise::<u32>("/vo", 1);

        // Server thread not started: nothing drains the queue
        publisher.publish(&1).unwrap();
        assert!(matches!(publisher.publish(&2), Err(PublisherError::QueueFull(_))));
        drop(server);
        assert!(matches!(publisher.publish(&3), Err(PublisherError::Disconnected)));
    }
}
