//! RecordSink - appends bundles to a persistent stream writer.
//!
//! The writer collaborator owns encoding/container internals; `DiskWriter`
//! is the bundled default that lays payloads out as plain files.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use contracts::{Bundle, BundleWriter, OutputSink, PayloadKind, SinkFlow, StreamError};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Sink that forwards bundle payloads to a `BundleWriter`.
///
/// On teardown the writer is flushed and closed before the engine reports
/// fully stopped.
pub struct RecordSink {
    name: String,
    writer: Box<dyn BundleWriter>,
    path: PathBuf,
    appended: u64,
}

impl RecordSink {
    /// Create a new RecordSink recording to `path`.
    pub fn new(name: impl Into<String>, writer: Box<dyn BundleWriter>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            writer,
            path,
            appended: 0,
        }
    }

    /// Record destination (diagnostics only).
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for RecordSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "record_sink_deliver",
        skip(self, bundle),
        fields(sink = %self.name, sequence = bundle.sequence)
    )]
    fn deliver(&mut self, bundle: &Bundle) -> Result<SinkFlow, StreamError> {
        self.writer.append(bundle)?;
        self.appended += 1;
        Ok(SinkFlow::Continue)
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        self.writer.flush()
    }

    fn close(&mut self) -> Result<(), StreamError> {
        self.writer.flush()?;
        self.writer.close()?;
        info!(
            sink = %self.name,
            path = %self.path.display(),
            bundles = self.appended,
            "RecordSink closed"
        );
        Ok(())
    }
}

/// Metadata written next to each recorded bundle.
#[derive(Debug, Serialize)]
struct BundleMeta<'a> {
    sequence: u64,
    timestamp: f64,
    streams: BTreeMap<&'a str, PacketMeta>,
}

#[derive(Debug, Serialize)]
struct PacketMeta {
    kind: PayloadKind,
    timestamp: f64,
    bytes: usize,
}

/// Default `BundleWriter`: one session directory per run, one subdirectory
/// per stream, payloads as `<sequence>.bin` plus `meta/<sequence>.json`.
pub struct DiskWriter {
    session_dir: PathBuf,
    created_dirs: HashSet<PathBuf>,
}

impl DiskWriter {
    /// Create a writer rooted at `root`; a timestamped session directory is
    /// created underneath it.
    pub fn create(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let session_dir = root.into().join(format!("session-{stamp}"));
        fs::create_dir_all(&session_dir)?;

        Ok(Self {
            session_dir,
            created_dirs: HashSet::new(),
        })
    }

    /// Directory this session records into.
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    fn ensure_dir(&mut self, dir: PathBuf) -> std::io::Result<PathBuf> {
        if !self.created_dirs.contains(&dir) {
            fs::create_dir_all(&dir)?;
            self.created_dirs.insert(dir.clone());
        }
        Ok(dir)
    }

    fn write_bundle(&mut self, bundle: &Bundle) -> std::io::Result<()> {
        for (stream, packet) in &bundle.packets {
            let dir = self.ensure_dir(self.session_dir.join(stream.as_str()))?;
            let mut file = File::create(dir.join(format!("{}.bin", bundle.sequence)))?;
            file.write_all(&packet.payload)?;
        }

        let meta = BundleMeta {
            sequence: bundle.sequence,
            timestamp: bundle.timestamp(),
            streams: bundle
                .packets
                .iter()
                .map(|(name, p)| {
                    (
                        name.as_str(),
                        PacketMeta {
                            kind: p.kind,
                            timestamp: p.timestamp,
                            bytes: p.payload.len(),
                        },
                    )
                })
                .collect(),
        };
        let meta_dir = self.ensure_dir(self.session_dir.join("meta"))?;
        let file = File::create(meta_dir.join(format!("{}.json", bundle.sequence)))?;
        serde_json::to_writer(file, &meta)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(())
    }
}

impl BundleWriter for DiskWriter {
    fn append(&mut self, bundle: &Bundle) -> Result<(), StreamError> {
        self.write_bundle(bundle)
            .map_err(|e| StreamError::record("disk", e.to_string()))
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        // Files are created and closed per append
        Ok(())
    }

    fn close(&mut self) -> Result<(), StreamError> {
        debug!(session = %self.session_dir.display(), "DiskWriter closed");
        Ok(())
    }
}
