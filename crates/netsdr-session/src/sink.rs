//! Append-only sample file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use netsdr_frame::SampleWidth;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

#[derive(Default)]
struct SinkState {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    samples_written: u64,
}

/// Destination for decoded IQ samples.
///
/// Samples are written little-endian at the configured width. Each
/// `append` holds the lock for the whole batch, so batches from
/// concurrent datagrams never interleave and a `close` racing an
/// `append` either sees the batch fully written or not at all.
pub struct SampleSink {
    width: SampleWidth,
    state: Mutex<SinkState>,
}

impl SampleSink {
    pub fn new(width: SampleWidth) -> Self {
        Self {
            width,
            state: Mutex::new(SinkState::default()),
        }
    }

    pub fn width(&self) -> SampleWidth {
        self.width
    }

    /// Open `path` for appending, creating it if needed.
    ///
    /// A file that is already open is flushed and closed first.
    pub fn open(&self, path: &Path) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SessionError::Sink {
                path: path.to_path_buf(),
                source,
            })?;

        let mut state = self.lock();
        if let Some(mut previous) = state.writer.take() {
            if let Err(err) = previous.flush() {
                warn!(error = %err, "failed to flush previous sample file");
            }
        }
        state.writer = Some(BufWriter::new(file));
        state.path = Some(path.to_path_buf());
        state.samples_written = 0;
        debug!(path = %path.display(), "sample sink opened");
        Ok(())
    }

    /// Write `samples` in arrival order. Returns how many were written;
    /// a closed sink accepts nothing and reports zero.
    pub fn append(&self, samples: &[i32]) -> Result<usize> {
        let width = self.width.bytes();
        let mut encoded = Vec::with_capacity(samples.len() * width);
        for sample in samples {
            encoded.extend_from_slice(&sample.to_le_bytes()[..width]);
        }

        let mut state = self.lock();
        let SinkState {
            path,
            writer,
            samples_written,
        } = &mut *state;
        let Some(writer) = writer.as_mut() else {
            return Ok(0);
        };

        writer
            .write_all(&encoded)
            .and_then(|()| writer.flush())
            .map_err(|source| SessionError::Sink {
                path: path.clone().unwrap_or_default(),
                source,
            })?;
        *samples_written += samples.len() as u64;
        Ok(samples.len())
    }

    /// Flush and release the file. Closing a closed sink is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock();
        let Some(mut writer) = state.writer.take() else {
            return Ok(());
        };
        let path = state.path.clone().unwrap_or_default();
        drop(state);

        writer
            .flush()
            .map_err(|source| SessionError::Sink { path: path.clone(), source })?;
        debug!(path = %path.display(), "sample sink closed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.lock().writer.is_some()
    }

    /// Samples written since the sink was last opened.
    pub fn samples_written(&self) -> u64 {
        self.lock().samples_written
    }

    /// Path of the current (or most recent) file.
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SampleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SampleSink")
            .field("width", &self.width)
            .field("path", &state.path)
            .field("open", &state.writer.is_some())
            .field("samples_written", &state.samples_written)
            .finish()
    }
}
