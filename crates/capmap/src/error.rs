use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A geometry variant the reducer and union code do not know how to walk.
    #[error("unsupported geometry type: {kind}")]
    UnsupportedGeometry { kind: String },

    #[error("table source must name at least one capacity table")]
    InvalidTableSource,

    #[error("{}: missing required column `{column}`", .path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("{}: {message}", .path.display())]
    InvalidGeoJson { path: PathBuf, message: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing_column(column: &str, path: impl Into<PathBuf>) -> Self {
        Error::MissingColumn {
            column: column.to_owned(),
            path: path.into(),
        }
    }
}
