//! Sequences resolve → read → curate → write for one derivative.

use std::fmt;
use std::path::{Path, PathBuf};

use log::info;

use crate::curate::curate;
use crate::error::SyncError;
use crate::exiftool::MetadataBackend;
use crate::resolve::SourceResolver;
use crate::{CuratedMetadata, PropagateConfig};

/// Pipeline stage, named in diagnostics when a run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Read,
    Curate,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolve => "resolve",
            Stage::Read => "read",
            Stage::Curate => "curate",
            Stage::Write => "write",
        })
    }
}

/// A pipeline failure tagged with the stage it occurred in.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage: {error}")]
pub struct StageError {
    pub stage: Stage,
    pub error: SyncError,
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct Propagated {
    /// The resolved original capture.
    pub source: PathBuf,
    /// The record that was written onto the derivative.
    pub fields: CuratedMetadata,
}

/// One-shot driver: strictly linear, no retry, the destructive write
/// happens exactly once and only after curation completed.
pub struct Pipeline<B: MetadataBackend> {
    config: PropagateConfig,
    resolver: SourceResolver,
    backend: B,
}

impl<B: MetadataBackend> Pipeline<B> {
    pub fn new(config: PropagateConfig, backend: B) -> Self {
        let resolver = SourceResolver::new(config.extensions.clone());
        Self {
            config,
            resolver,
            backend,
        }
    }

    pub fn run(&self, derivative: &Path) -> Result<Propagated, StageError> {
        let source = self
            .resolver
            .resolve(derivative)
            .map_err(|error| StageError { stage: Stage::Resolve, error })?;
        info!("source image: {}", source.display());

        let raw = self
            .backend
            .extract(&source)
            .map_err(|error| StageError { stage: Stage::Read, error })?;
        info!("read {} raw tag(s) from source", raw.len());

        let fields = curate(&raw, &self.config);
        info!(
            "curated fields: [{}]",
            fields.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        self.backend
            .apply(&fields, derivative)
            .map_err(|error| StageError { stage: Stage::Write, error })?;

        Ok(Propagated { source, fields })
    }
}
