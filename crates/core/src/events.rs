//! Event System
//!
//! Background tasks never call user callbacks directly. They post
//! [`RequestEvent`]s to an [`EventQueue`]; the owner of the request drains the
//! queue on its own context, where the callbacks run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use crate::app::App;
use crate::error::RequestError;
use crate::selection::SelectionListener;

/// Receives the results of a load cycle
pub trait LoadCallback: Send + Sync {
    /// The filter is about to be parsed
    fn on_loading_filter(&self) {}

    /// Enumeration progress, 0..=100
    fn on_load_progress(&self, _percent: u8) {}

    fn on_apps_loaded(&self, apps: &[App]);

    fn on_load_error(&self, error: &RequestError);
}

/// Receives the results of a send cycle
pub trait SendCallback: Send + Sync {
    /// `send()` was called and is validating
    fn on_request_preparing(&self) {}

    /// Rewrite the archive location before it is handed to the email composer
    fn process_archive(&self, archive: &Path) -> PathBuf {
        archive.to_path_buf()
    }

    fn on_request_error(&self, error: &RequestError);

    fn on_request_sent(&self);
}

/// Live callback references. Never persisted; re-attached after a restore.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub load: Option<Arc<dyn LoadCallback>>,
    pub send: Option<Arc<dyn SendCallback>>,
    pub selection: Option<Arc<dyn SelectionListener>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_load(mut self, callback: Arc<dyn LoadCallback>) -> Self {
        self.load = Some(callback);
        self
    }

    pub fn with_send(mut self, callback: Arc<dyn SendCallback>) -> Self {
        self.send = Some(callback);
        self
    }

    pub fn with_selection(mut self, listener: Arc<dyn SelectionListener>) -> Self {
        self.selection = Some(listener);
        self
    }
}

/// Messages posted from background tasks
#[derive(Debug)]
pub enum RequestEvent {
    /// Enumeration progress
    LoadProgress(u8),
    /// Enumeration finished
    AppsLoaded(Vec<App>),
    /// Filter parsing failed
    LoadFailed(RequestError),
    /// A send step failed
    SendFailed(RequestError),
    /// Archive ready for the email composer
    Packaged { archive: PathBuf, body: String },
    /// Archive uploaded to the remote service
    Uploaded { archive: PathBuf },
}

/// Event tagged with the request generation that produced it
#[derive(Debug)]
pub struct Envelope {
    pub generation: u64,
    pub event: RequestEvent,
}

/// Posting half handed to background tasks
#[derive(Clone)]
pub struct EventSender {
    generation: u64,
    sender: Sender<Envelope>,
}

impl EventSender {
    /// Post an event. Returns false when the request is gone.
    pub fn post(&self, event: RequestEvent) -> bool {
        let delivered = self
            .sender
            .send(Envelope {
                generation: self.generation,
                event,
            })
            .is_ok();
        if !delivered {
            debug!("Request dropped, discarding event");
        }
        delivered
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Single-consumer queue drained on the delivery context
pub struct EventQueue {
    sender: Sender<Envelope>,
    receiver: Receiver<Envelope>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Sender for a task of the given generation
    pub fn sender(&self, generation: u64) -> EventSender {
        EventSender {
            generation,
            sender: self.sender.clone(),
        }
    }

    /// Take every pending event without blocking
    pub fn drain(&self) -> Vec<Envelope> {
        self.receiver.try_iter().collect()
    }

    /// Block until an event arrives
    pub fn recv(&self) -> Option<Envelope> {
        self.receiver.recv().ok()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
