//! Best and periodic checkpoints of a training run.
//!
//! The best parameters are always kept in memory so they can be restored when
//! the run ends. With a checkpoint directory configured, they are also written
//! to `best_{name}.bin`, and every `interval` epochs (never at epoch 0) an
//! intermediate snapshot `intermediate_{name}_epoch_{epoch}.bin` is written.
//! Disk failures are logged and otherwise ignored: the in-memory state stays
//! valid and training continues.

use std::{
    fs,
    path::{Path, PathBuf},
};

use mimicry_nn::{params::ParameterSet, persist};

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: Option<PathBuf>,
    name: &'static str,
    interval: usize,
    best: Option<(usize, ParameterSet)>,
}

impl CheckpointStore {
    /// Creates a store for the model called `name` (e.g. `"model"`).
    ///
    /// An `interval` of zero disables intermediate checkpoints.
    #[must_use]
    pub fn new(dir: Option<&Path>, name: &'static str, interval: usize) -> Self {
        Self {
            dir: dir.map(Path::to_owned),
            name,
            interval,
            best: None,
        }
    }

    #[must_use]
    pub fn best_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("best_{}.bin", self.name)))
    }

    #[must_use]
    pub fn intermediate_path(&self, epoch: usize) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("intermediate_{}_epoch_{epoch}.bin", self.name)))
    }

    #[must_use]
    pub fn is_intermediate_epoch(&self, epoch: usize) -> bool {
        self.interval > 0 && epoch > 0 && epoch % self.interval == 0
    }

    /// Records `params` as the best model, seen at `epoch`.
    pub fn record_best(&mut self, epoch: usize, params: &ParameterSet) {
        self.best = Some((epoch, params.clone()));
        if let Some(path) = self.best_path() {
            write_checkpoint(&path, params);
        }
    }

    /// Writes an intermediate snapshot if `epoch` is on the interval.
    pub fn record_epoch(&self, epoch: usize, params: &ParameterSet) {
        if !self.is_intermediate_epoch(epoch) {
            return;
        }
        if let Some(path) = self.intermediate_path(epoch) {
            write_checkpoint(&path, params);
        }
    }

    #[must_use]
    pub fn best_epoch(&self) -> Option<usize> {
        self.best.as_ref().map(|(epoch, _)| *epoch)
    }

    #[must_use]
    pub fn best(&self) -> Option<&ParameterSet> {
        self.best.as_ref().map(|(_, params)| params)
    }

    pub fn take_best(&mut self) -> Option<ParameterSet> {
        self.best.take().map(|(_, params)| params)
    }
}

fn write_checkpoint(path: &Path, params: &ParameterSet) {
    if let Some(dir) = path.parent()
        && let Err(e) = fs::create_dir_all(dir)
    {
        tracing::warn!(path = %dir.display(), error = %e, "failed to create checkpoint directory");
        return;
    }
    match persist::save(params, path) {
        Ok(()) => tracing::info!(path = %path.display(), "saved checkpoint"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save checkpoint"),
    }
}
