//! Ephemeral audio artifact ownership.
//!
//! Every audio buffer or temp file the pipeline creates (decoded uploads,
//! canonical waveforms, synthesized speech) is registered here the moment it
//! exists and released exactly once, on every code path. Intermediate
//! artifacts are created through an [`ArtifactScope`], whose `Drop` releases
//! anything not explicitly kept, so failures and panics cannot leak buffers
//! or stray files.

use crate::error::{PolyvoxError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Encoding of an artifact's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Raw container bytes as uploaded, format not yet probed.
    Container,
    /// Canonical waveform serialized as WAV.
    Wav,
    /// Synthesized speech.
    Mp3,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Container => "bin",
            ArtifactFormat::Wav => "wav",
            ArtifactFormat::Mp3 => "mp3",
        }
    }
}

/// Opaque handle to a registered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId(u64);

/// Where the artifact lives until release.
#[derive(Debug)]
enum Backing {
    Memory(Vec<u8>),
    TempFile(PathBuf),
}

/// Lifecycle state. `Released` is terminal; release is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Registered, not yet handed to playback.
    Pending,
    /// Handed to the caller for playback; still owned here until released.
    Delivered,
    /// Backing freed. Terminal.
    Released,
}

#[derive(Debug)]
struct ArtifactRecord {
    backing: Option<Backing>,
    format: ArtifactFormat,
    disposition: Disposition,
}

/// Owns every ephemeral audio artifact from creation to release.
#[derive(Debug, Default)]
pub struct ArtifactLifecycleManager {
    records: Mutex<HashMap<ArtifactId, ArtifactRecord>>,
    next_id: AtomicU64,
}

impl ArtifactLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, backing: Backing, format: ArtifactFormat) -> ArtifactId {
        let id = ArtifactId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = ArtifactRecord {
            backing: Some(backing),
            format,
            disposition: Disposition::Pending,
        };
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, record);
        id
    }

    /// Register an in-memory buffer.
    pub fn register_memory(&self, bytes: Vec<u8>, format: ArtifactFormat) -> ArtifactId {
        let id = self.insert(Backing::Memory(bytes), format);
        tracing::trace!(?id, ?format, "artifact registered (memory)");
        id
    }

    /// Register a temp file. The manager takes ownership: the file is
    /// deleted on release.
    pub fn register_temp_file(&self, path: PathBuf, format: ArtifactFormat) -> ArtifactId {
        tracing::trace!(path = %path.display(), ?format, "artifact registered (file)");
        self.insert(Backing::TempFile(path), format)
    }

    /// Read the artifact payload for playback.
    pub fn bytes(&self, id: ArtifactId) -> Result<Vec<u8>> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let record = records
            .get(&id)
            .ok_or_else(|| PolyvoxError::Synthesis {
                message: format!("unknown artifact {id:?}"),
            })?;
        match &record.backing {
            Some(Backing::Memory(bytes)) => Ok(bytes.clone()),
            Some(Backing::TempFile(path)) => Ok(std::fs::read(path)?),
            None => Err(PolyvoxError::Synthesis {
                message: format!("artifact {id:?} already released"),
            }),
        }
    }

    /// Mark an artifact as handed to playback. No effect once released.
    pub fn mark_delivered(&self, id: ArtifactId) {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(record) = records.get_mut(&id)
            && record.disposition != Disposition::Released
        {
            record.disposition = Disposition::Delivered;
        }
    }

    /// Release an artifact's backing. Idempotent: releasing an already
    /// released or unknown artifact is a no-op.
    pub fn release(&self, id: ArtifactId) {
        let backing = {
            let mut records = self
                .records
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match records.get_mut(&id) {
                Some(record) if record.disposition != Disposition::Released => {
                    record.disposition = Disposition::Released;
                    record.backing.take()
                }
                _ => None,
            }
        };
        match backing {
            Some(Backing::TempFile(path)) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    // Best effort: the file may already be gone.
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact file");
                } else {
                    tracing::trace!(?id, path = %path.display(), "artifact released");
                }
            }
            Some(Backing::Memory(_)) => {
                tracing::trace!(?id, "artifact released");
            }
            None => {}
        }
    }

    /// Current lifecycle state, if the artifact is known.
    pub fn disposition(&self, id: ArtifactId) -> Option<Disposition> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&id)
            .map(|r| r.disposition)
    }

    /// Number of artifacts that have not reached `Released`.
    pub fn outstanding(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|r| r.disposition != Disposition::Released)
            .count()
    }

    /// Open a scope whose `Drop` releases every artifact registered through
    /// it, except those handed out with [`ArtifactScope::keep`].
    pub fn scope(&self) -> ArtifactScope<'_> {
        ArtifactScope {
            manager: self,
            tracked: Vec::new(),
        }
    }

    /// Run a closure inside a scope, releasing all scope artifacts on exit:
    /// normal return, error, or unwind.
    pub fn with_scope<T>(&self, f: impl FnOnce(&mut ArtifactScope<'_>) -> Result<T>) -> Result<T> {
        let mut scope = self.scope();
        f(&mut scope)
    }
}

/// Tracks artifacts created during one pipeline stage and releases them on
/// drop. Keeping an artifact removes it from the scope so ownership passes
/// back to the manager's caller.
pub struct ArtifactScope<'a> {
    manager: &'a ArtifactLifecycleManager,
    tracked: Vec<ArtifactId>,
}

impl ArtifactScope<'_> {
    pub fn register_memory(&mut self, bytes: Vec<u8>, format: ArtifactFormat) -> ArtifactId {
        let id = self.manager.register_memory(bytes, format);
        self.tracked.push(id);
        id
    }

    pub fn register_temp_file(&mut self, path: PathBuf, format: ArtifactFormat) -> ArtifactId {
        let id = self.manager.register_temp_file(path, format);
        self.tracked.push(id);
        id
    }

    /// Exclude an artifact from the scope's cleanup, e.g. the synthesized
    /// answer that outlives the pipeline run for playback.
    pub fn keep(&mut self, id: ArtifactId) {
        self.tracked.retain(|tracked| *tracked != id);
    }
}

impl Drop for ArtifactScope<'_> {
    fn drop(&mut self) {
        for id in self.tracked.drain(..) {
            self.manager.release(id);
        }
    }
}
