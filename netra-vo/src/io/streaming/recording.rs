//! In-memory publisher.

use parking_lot::Mutex;
use std::sync::Arc;

use super::{Publisher, Result};

/// Publisher that stores every message it is given.
///
/// Clones share the same storage, so a test can hand one clone to the node
/// and inspect the other.
#[derive(Debug)]
pub struct RecordingPublisher<M> {
    messages: Arc<Mutex<Vec<M>>>,
}

impl<M> Clone for RecordingPublisher<M> {
    fn clone(&self) -> Self {
        Self {
            messages: Arc::clone(&self.messages),
        }
    }
}

impl<M> Default for RecordingPublisher<M> {
    fn default() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<M: Clone> RecordingPublisher<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far.
    pub fn messages(&self) -> Vec<M> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Drain and return the stored messages.
    pub fn take(&self) -> Vec<M> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl<M: Clone> Publisher<M> for RecordingPublisher<M> {
    fn publish(&mut self, msg: &M) -> Result<()> {
        self.messages.lock().push(msg.clone());
        Ok(())
    }
}
