//! Versioned precedent snapshots and their on-disk publication.
//!
//! A snapshot is rebuilt in batch from a frozen corpus, fingerprinted, and
//! published atomically. Readers only ever see a complete snapshot: a failed
//! rebuild leaves the previous one in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use pharmyx_common::engine_config::PrecedentConfig;
use pharmyx_common::error::{PharmyxError, Result};
use pharmyx_common::records::{validate_drug, DrugRecord};

use crate::precedent::{aggregate_precedents, IndicationPrecedent, PrecedentSource};

pub const SNAPSHOT_FILE: &str = "precedents.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentSnapshot {
    /// SHA-256 over the corpus and aggregation parameters.
    pub version: String,
    pub built_at: DateTime<Utc>,
    pub min_sample_size: u32,
    pub precedents: BTreeMap<String, IndicationPrecedent>,
}

/// Fingerprint a corpus together with the parameters that shape the
/// aggregation. Independent of drug order.
pub fn corpus_fingerprint(corpus: &[DrugRecord], cfg: &PrecedentConfig) -> Result<String> {
    let mut drugs: Vec<&DrugRecord> = corpus.iter().collect();
    drugs.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    hasher.update(cfg.min_sample_size.to_le_bytes());
    for drug in drugs {
        hasher.update(serde_json::to_vec(drug)?);
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

impl PrecedentSnapshot {
    pub fn build(corpus: &[DrugRecord], cfg: &PrecedentConfig, built_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            version: corpus_fingerprint(corpus, cfg)?,
            built_at,
            min_sample_size: cfg.min_sample_size,
            precedents: aggregate_precedents(corpus, cfg),
        })
    }
}

impl PrecedentSource for PrecedentSnapshot {
    fn precedent(&self, indication_key: &str) -> Option<&IndicationPrecedent> {
        self.precedents.get(indication_key)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

/// Directory holding the published snapshot.
#[derive(Debug, Clone)]
pub struct PrecedentStore {
    dir: PathBuf,
}

impl PrecedentStore {
    /// Open a store, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    /// The currently published snapshot, or None if nothing was published yet.
    pub fn load(&self) -> Result<Option<PrecedentSnapshot>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let snapshot: PrecedentSnapshot = serde_json::from_str(&content).map_err(|e| {
            PharmyxError::Snapshot(format!("{} is not a valid snapshot: {e}", path.display()))
        })?;
        Ok(Some(snapshot))
    }

    /// Write to a temp file in the store directory, then rename over the
    /// published file.
    pub fn publish(&self, snapshot: &PrecedentSnapshot) -> Result<PathBuf> {
        let path = self.snapshot_path();
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, snapshot)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| PharmyxError::Io(e.error))?;

        debug!(path = %path.display(), version = %snapshot.version, "Published precedent snapshot");
        Ok(path)
    }
}

// ── Batch job ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Published { version: String, indications: usize },
    /// The published snapshot already matches the corpus.
    Unchanged { version: String },
}

/// One rebuild run. Safe to re-run: an unchanged corpus is a no-op.
pub struct PrecedentJob<'a> {
    pub id: Uuid,
    store: &'a PrecedentStore,
    cfg: PrecedentConfig,
}

impl<'a> PrecedentJob<'a> {
    pub fn new(store: &'a PrecedentStore, cfg: PrecedentConfig) -> Self {
        Self { id: Uuid::new_v4(), store, cfg }
    }

    pub fn run(&self, corpus: &[DrugRecord]) -> Result<JobOutcome> {
        info!(job_id = %self.id, drugs = corpus.len(), "Precedent rebuild started");

        for drug in corpus {
            validate_drug(drug)?;
        }

        let version = corpus_fingerprint(corpus, &self.cfg)?;
        if let Some(current) = self.store.load()? {
            if current.version == version {
                info!(job_id = %self.id, version = %version, "Corpus unchanged, snapshot kept");
                return Ok(JobOutcome::Unchanged { version });
            }
        }

        let snapshot = PrecedentSnapshot::build(corpus, &self.cfg, Utc::now())?;
        let indications = snapshot.precedents.len();
        self.store.publish(&snapshot)?;

        info!(
            job_id = %self.id,
            version = %snapshot.version,
            indications,
            "Precedent snapshot published"
        );
        Ok(JobOutcome::Published { version: snapshot.version, indications })
    }
}
