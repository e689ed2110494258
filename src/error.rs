use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A full lookback window before a nominal boundary held no newline,
    /// meaning some line near `offset` is longer than the window.
    #[error("newline not found within {window} bytes before offset {offset}")]
    Split { offset: u64, window: usize },

    #[error("cannot {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("worker {worker} failed")]
    Worker {
        worker: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("run cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
