use std::num::NonZeroUsize;

use crate::error::{Error, Result};
use crate::split::DEFAULT_WINDOW;

/// How workers get at their bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Every worker opens the file, seeks to its part and reads it.
    #[default]
    Seek,
    /// The file is mapped once and workers scan slices of the mapping.
    Mapped,
}

/// How worker tables are folded together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reduction {
    /// Tables are merged one by one as workers report in.
    #[default]
    Serial,
    /// Tables are collected, then reduced pairwise on the rayon pool.
    Tree,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub workers: NonZeroUsize,
    pub window: usize,
    pub strategy: ReadStrategy,
    pub reduction: Reduction,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            window: DEFAULT_WINDOW,
            strategy: ReadStrategy::default(),
            reduction: Reduction::default(),
        }
    }
}

impl Config {
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(Error::Config("lookback window must be at least one byte".into()));
        }
        Ok(())
    }
}
