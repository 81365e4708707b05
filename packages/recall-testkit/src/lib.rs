mod error;
mod memory;

pub use error::{Error, Result};
pub use memory::{MemoryStore, ReadGate};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

use recall_config::Postgres;
use recall_storage::db::Db;

pub const DSN_ENV: &str = "RECALL_PG_DSN";

/// A scratch Postgres database created next to the one [`DSN_ENV`] points at.
///
/// The database is dropped by [`TestDatabase::cleanup`], or on a background thread when the value
/// is dropped without it (for example when the test panics).
pub struct TestDatabase {
	name: String,
	options: PgConnectOptions,
	admin: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	/// Returns `None` and reports the skipped test when [`DSN_ENV`] is unset.
	pub async fn from_env(test: &str) -> Result<Option<Self>> {
		let Ok(dsn) = env::var(DSN_ENV) else {
			eprintln!("Skipping {test}; set {DSN_ENV} to run this test.");

			return Ok(None);
		};

		Self::create(&dsn).await.map(Some)
	}

	pub async fn create(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Invalid {DSN_ENV}: {err}.")))?;
		let admin = base.clone().database("postgres");
		let name = format!("recall_test_{}", Uuid::new_v4().simple());
		let mut conn = PgConnection::connect_with(&admin).await?;

		sqlx::query(&format!(r#"CREATE DATABASE "{name}""#)).execute(&mut conn).await?;
		conn.close().await?;

		Ok(Self { options: base.database(&name), name, admin, dropped: false })
	}

	pub fn dsn(&self) -> String {
		self.options.to_url_lossy().to_string()
	}

	/// A pooled store over the scratch database with the schema applied.
	pub async fn store(&self) -> Result<Db> {
		let cfg = Postgres { dsn: self.dsn(), pool_max_conns: 2 };
		let db = Db::connect(&cfg).await?;

		db.ensure_schema().await?;

		Ok(db)
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.dropped = true;

		drop_database(&self.admin, &self.name).await
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let admin = self.admin.clone();
		let name = self.name.clone();
		let handle = thread::spawn(move || {
			let outcome = Builder::new_current_thread()
				.enable_all()
				.build()
				.map_err(|err| Error::Message(err.to_string()))
				.and_then(|runtime| runtime.block_on(drop_database(&admin, &name)));

			if let Err(err) = outcome {
				eprintln!("Failed to drop scratch database {name}: {err}.");
			}
		});
		let _ = handle.join();
	}
}

async fn drop_database(admin: &PgConnectOptions, name: &str) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin).await?;

	// FORCE terminates the pooled connections the test may still hold.
	sqlx::query(&format!(r#"DROP DATABASE IF EXISTS "{name}" WITH (FORCE)"#))
		.execute(&mut conn)
		.await?;
	conn.close().await?;

	Ok(())
}
