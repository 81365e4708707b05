#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	/// A uniqueness constraint rejected the write, usually because a concurrent writer got there
	/// first.
	#[error("Conflict: {0}")]
	Conflict(String),
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		if let sqlx::Error::Database(db_err) = &err
			&& db_err.is_unique_violation()
		{
			return Self::Conflict(db_err.message().to_string());
		}

		Self::Sqlx(err)
	}
}
impl Error {
	/// Whether the database could not be reached, as opposed to rejecting the statement.
	pub fn is_unavailable(&self) -> bool {
		matches!(
			self,
			Self::Sqlx(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)
		)
	}
}
