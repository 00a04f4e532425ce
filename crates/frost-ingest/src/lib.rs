pub mod error;
pub mod service;

pub use error::{IngestError, Result};
pub use service::{IngestOutcome, IngestService, ReadingPayload, ServiceConfig};
