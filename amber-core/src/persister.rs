use log::debug;

use crate::config::Options;
use crate::graph::{Graph, NodeId, Snapshot};
use crate::label::LabelPlan;
use crate::persist::{ConvertError, Persist};
use crate::reader::{self, ParseError};
use crate::scratch::ScratchPool;
use crate::store::ArtifactStore;
use crate::writer::{self, EncodeError};

/// Error type for save and restore.
#[derive(Debug, thiserror::Error)]
pub enum PersistError<E> {
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(E),
    #[error("cannot encode value: {0}")]
    Encode(#[from] EncodeError),
    #[error("malformed artifact: {0}")]
    Malformed(#[from] ParseError),
    #[error("cannot convert value: {0}")]
    Convert(#[from] ConvertError),
}

/// Saves value graphs to and restores them from an [`ArtifactStore`].
///
/// Each call borrows the persister mutably and runs to completion. The
/// scratch buffer is acquired per call and cleared before the call returns,
/// whether it succeeds or fails.
pub struct Persister<S: ArtifactStore> {
    store: S,
    scratch: ScratchPool,
    options: Options,
}

impl<S: ArtifactStore> Persister<S> {
    /// Creates a persister with default options.
    pub fn new(store: S) -> Self {
        Self::with_options(store, Options::default())
    }

    pub fn with_options(store: S, options: Options) -> Self {
        Persister {
            store,
            scratch: ScratchPool::new(),
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn scratch(&self) -> &ScratchPool {
        &self.scratch
    }

    /// Consumes the persister and returns its store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Writes the value rooted at `root` to `destination`, replacing any
    /// previous artifact there.
    ///
    /// `comment` is written as a comment header; when it is `None` the
    /// configured default comment, if any, is used instead.
    pub fn save(
        &mut self,
        graph: &Graph,
        root: NodeId,
        destination: &str,
        comment: Option<&str>,
    ) -> Result<(), PersistError<S::Error>> {
        let plan = LabelPlan::assign(graph, root);
        debug!(
            "saving {} nodes ({} labeled) to {}",
            plan.reachable(),
            plan.len(),
            destination
        );

        let comment = comment.or(self.options.default_comment.as_deref());
        let mut scratch = self.scratch.acquire();
        writer::write_artifact(&mut scratch, graph, root, &plan, comment, &self.options)?;
        self.store
            .write_all(destination, scratch.as_bytes())
            .map_err(PersistError::Store)?;

        debug!("saved {} bytes to {}", scratch.len(), destination);
        Ok(())
    }

    /// Reads the artifact at `source` and rebuilds its value graph.
    pub fn restore(&mut self, source: &str) -> Result<Snapshot, PersistError<S::Error>> {
        let bytes = self
            .store
            .read_all(source)
            .map_err(PersistError::Store)?
            .ok_or_else(|| PersistError::NotFound(source.to_string()))?;

        let text = std::str::from_utf8(&bytes).map_err(|e| ParseError::invalid_utf8(&bytes, e))?;
        let mut scratch = self.scratch.acquire();
        scratch.push_str(text);
        let snapshot = reader::read_with(scratch.as_str(), &self.options)?;

        debug!(
            "restored {} nodes from {} ({} bytes)",
            snapshot.graph.len(),
            source,
            bytes.len()
        );
        Ok(snapshot)
    }

    /// Stores `value` in a fresh graph and saves it.
    pub fn save_value<T: Persist>(
        &mut self,
        value: &T,
        destination: &str,
        comment: Option<&str>,
    ) -> Result<(), PersistError<S::Error>> {
        let mut graph = Graph::new();
        let root = value.store(&mut graph);
        self.save(&graph, root, destination, comment)
    }

    /// Restores the artifact at `source` and loads it as a `T`.
    pub fn restore_value<T: Persist>(&mut self, source: &str) -> Result<T, PersistError<S::Error>> {
        let snapshot = self.restore(source)?;
        Ok(T::load(&snapshot.graph, snapshot.root)?)
    }
}
