use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, schema};

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &trove_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let lock_id: i64 = 7_120_311;
		// Advisory locks are held per connection; the transaction scopes it to one connection.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		let statements = schema::statements();

		for statement in &statements {
			sqlx::query(statement.as_str()).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		tracing::debug!(statements = statements.len(), "Schema ensured.");

		Ok(())
	}
}
