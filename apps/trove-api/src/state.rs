use std::sync::Arc;

use trove_service::TroveService;
use trove_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TroveService>,
}
impl AppState {
	pub async fn new(config: trove_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		tracing::info!(session_backend = %config.session.backend, "Retrieval service ready.");

		Ok(Self::from_service(TroveService::new(config, db, qdrant)))
	}

	pub fn from_service(service: TroveService) -> Self {
		Self { service: Arc::new(service) }
	}
}
