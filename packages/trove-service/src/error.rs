use trove_domain::provenance::SourceKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Candidate source {} unavailable: {message}", kind.as_str())]
	SourceUnavailable { kind: SourceKind, message: String },
	#[error("Relevance scorer unavailable: {message}")]
	ScorerUnavailable { message: String },
	#[error("Session store error: {message}")]
	SessionStore { message: String },
	#[error("Request timed out after {timeout_ms} ms.")]
	Timeout { timeout_ms: u64 },
}
impl Error {
	pub fn invalid_request(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}
}

impl From<trove_storage::Error> for Error {
	fn from(err: trove_storage::Error) -> Self {
		match err {
			trove_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			trove_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<trove_providers::Error> for Error {
	fn from(err: trove_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
