use std::sync::Arc;

use recall_service::RecallService;
use recall_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RecallService>,
}
impl AppState {
	/// Connects to Postgres, bootstraps the schema and wires the default providers.
	pub async fn new(config: recall_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::from_service(RecallService::new(config, Arc::new(db))))
	}

	pub fn from_service(service: RecallService) -> Self {
		Self { service: Arc::new(service) }
	}
}
