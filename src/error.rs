//! Error taxonomy for fetching, aggregating and exporting.

use thiserror::Error;

/// Failure of a single page request against the remote store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Network failure, 5xx or 429. Worth retrying.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Any other non-success status. Retrying will not help.
    #[error("store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed store response: {0}")]
    Malformed(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Failure to obtain a complete collection.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("page at offset {offset} of '{collection}' failed after {attempts} attempt(s): {source}")]
    Page {
        collection: String,
        offset: usize,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("'{collection}' reported {expected} records but {retrieved} unique records were retrieved")]
    IncompletePagination {
        collection: String,
        expected: usize,
        retrieved: usize,
    },

    #[error("row {index} of '{collection}' could not be decoded: {source}")]
    MalformedRow {
        collection: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while producing an output artifact.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("sheet '{sheet}' has {rows} rows, more than a worksheet can hold")]
    TooManyRows { sheet: String, rows: usize },
}

/// Anything that aborts a run before artifacts are published.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("collection '{0}' returned no records")]
    EmptyCollection(String),

    #[error("no visits fall inside the requested date range")]
    EmptyAfterFilter,

    #[error("aggregate invariant violated: {0}")]
    InvariantViolated(String),

    #[error(transparent)]
    Export(#[from] ExportError),
}
