pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Could not interpret input: {message}")]
	ParseFailure { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Dependency unavailable: {message}")]
	DependencyUnavailable { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}
}

impl From<recall_storage::Error> for Error {
	fn from(err: recall_storage::Error) -> Self {
		if err.is_unavailable() {
			return Self::DependencyUnavailable { message: err.to_string() };
		}

		match err {
			recall_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			recall_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			recall_storage::Error::NotFound(message) => Self::NotFound { message },
			recall_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<recall_providers::Error> for Error {
	fn from(err: recall_providers::Error) -> Self {
		Self::DependencyUnavailable { message: err.to_string() }
	}
}
