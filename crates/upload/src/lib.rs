//! Upload collaborator: an asynchronous file transfer whose outcome is
//! observed synchronously by the owning widget. The transfer runs on a
//! background task; terminal results arrive over a channel and are folded
//! into the current slot the next time its phase is read. Nothing here ever
//! blocks on a transfer.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

fn max_upload_bytes() -> usize {
    std::env::var("MAPSTYLE_MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1_000_000) // 1 MiB default
}

/// A file the user picked in the upload control, before transfer.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Meta record for a completed transfer. `id` is the opaque handle the
/// resource payload carries; downstream consumers resolve it against the
/// upload staging area.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl UploadedFile {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("payload too large ({size} > {limit} bytes)")]
    TooLarge { size: usize, limit: usize },
    #[error("transport: {0}")]
    Transport(String),
}

/// Observable lifecycle of the current selection's transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// No file chosen yet.
    Absent,
    /// Transfer started; no terminal result observed.
    Pending,
    /// Transfer finished; a value is available.
    Resolved,
    /// Transfer failed; a new selection is required.
    Rejected,
}

/// Transport boundary. Implementations own the transfer mechanics.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn transfer(&self, payload: FilePayload) -> Result<UploadedFile, UploadError>;
}

/// In-process transport that stages uploads in memory. Enforces the
/// configured size limit the way a real endpoint would.
#[derive(Default)]
pub struct MemoryTransport {
    staged: Mutex<HashMap<String, FilePayload>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The payload staged under an upload id, if held.
    pub fn staged(&self, id: &str) -> Option<FilePayload> {
        self.staged.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl UploadTransport for MemoryTransport {
    async fn transfer(&self, payload: FilePayload) -> Result<UploadedFile, UploadError> {
        let limit = max_upload_bytes();
        if payload.bytes.len() > limit {
            return Err(UploadError::TooLarge {
                size: payload.bytes.len(),
                limit,
            });
        }
        let meta = UploadedFile {
            id: format!("upload:{}", Uuid::new_v4().simple()),
            name: payload.name.clone(),
            size: payload.bytes.len() as u64,
            mime_type: payload.mime_type.clone(),
        };
        self.staged.lock().unwrap().insert(meta.id.clone(), payload);
        Ok(meta)
    }
}

enum SlotState {
    Pending,
    Resolved(UploadedFile),
    Rejected(UploadError),
}

struct Slot {
    rx: Receiver<Result<UploadedFile, UploadError>>,
    state: SlotState,
}

impl Slot {
    fn observe(&mut self) {
        if matches!(self.state, SlotState::Pending) {
            if let Ok(result) = self.rx.try_recv() {
                self.state = match result {
                    Ok(meta) => SlotState::Resolved(meta),
                    Err(e) => SlotState::Rejected(e),
                };
            }
        }
    }
}

/// Completion continuation for one selection. A ticket whose slot was since
/// replaced is stale: completing it has no observable effect.
pub struct UploadTicket {
    tx: Sender<Result<UploadedFile, UploadError>>,
}

impl UploadTicket {
    pub fn resolve(self, meta: UploadedFile) {
        let _ = self.tx.send(Ok(meta));
    }

    pub fn reject(self, error: UploadError) {
        let _ = self.tx.send(Err(error));
    }
}

/// Upload sub-widget state: holds the current selection's outcome and lets
/// the owning field read it without waiting.
pub struct UploadControl {
    slot: Mutex<Option<Slot>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for UploadControl {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadControl {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Install a fresh pending slot and hand back its completion ticket.
    /// Any earlier selection is discarded: its task is aborted and its
    /// eventual completion lands in a closed channel.
    pub fn begin(&self) -> UploadTicket {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
        let (tx, rx) = mpsc::channel();
        *self.slot.lock().unwrap() = Some(Slot {
            rx,
            state: SlotState::Pending,
        });
        UploadTicket { tx }
    }

    /// Begin a selection and drive the transport on a background task.
    pub fn select_file(&self, transport: Arc<dyn UploadTransport>, payload: FilePayload) {
        let ticket = self.begin();
        let name = payload.name.clone();
        info!(file = %name, size = payload.bytes.len(), "upload: transfer started");
        let task = tokio::spawn(async move {
            counter!("upload_attempts", 1u64);
            let t0 = Instant::now();
            match transport.transfer(payload).await {
                Ok(meta) => {
                    histogram!("upload_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
                    counter!("upload_ok", 1u64);
                    info!(file = %name, id = %meta.id, "upload: transfer finished");
                    ticket.resolve(meta);
                }
                Err(e) => {
                    counter!("upload_err", 1u64);
                    warn!(file = %name, error = %e, "upload: transfer failed");
                    ticket.reject(e);
                }
            }
        });
        *self.task.lock().unwrap() = Some(task);
    }

    /// Current phase. Folds a terminal result into the slot if one arrived
    /// since the last read.
    pub fn phase(&self) -> UploadPhase {
        let mut slot = self.slot.lock().unwrap();
        match slot.as_mut() {
            None => UploadPhase::Absent,
            Some(s) => {
                s.observe();
                match s.state {
                    SlotState::Pending => UploadPhase::Pending,
                    SlotState::Resolved(_) => UploadPhase::Resolved,
                    SlotState::Rejected(_) => UploadPhase::Rejected,
                }
            }
        }
    }

    /// Current upload value: the resolved file meta, or null when there is
    /// no resolved upload to carry.
    pub fn value(&self) -> Value {
        let mut slot = self.slot.lock().unwrap();
        match slot.as_mut() {
            None => Value::Null,
            Some(s) => {
                s.observe();
                match &s.state {
                    SlotState::Resolved(meta) => meta.to_value(),
                    _ => Value::Null,
                }
            }
        }
    }

    /// The current selection's rejection, if its transfer failed.
    pub fn error(&self) -> Option<UploadError> {
        let mut slot = self.slot.lock().unwrap();
        match slot.as_mut() {
            None => None,
            Some(s) => {
                s.observe();
                match &s.state {
                    SlotState::Rejected(e) => Some(e.clone()),
                    _ => None,
                }
            }
        }
    }

    /// Await the in-flight transfer task, if any. Test and demo helper; the
    /// form flow itself never waits on a transfer.
    pub async fn settled(&self) {
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}
