use serde_json::Value;
use sqlx::{PgPool, postgres::PgPoolOptions};
use time::OffsetDateTime;

use recall_domain::TagType;

use crate::{AttachedTag, BoxFuture, Note, NoteStore, Result, Tag, TagMatch, notes, schema, tags};

#[derive(Clone)]
pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &recall_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		let lock_id: i64 = 7_120_115;
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		tracing::debug!("Schema ensured.");

		Ok(())
	}
}

impl NoteStore for Db {
	fn insert_note<'a>(
		&'a self,
		text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Note>> {
		Box::pin(notes::insert_note(&self.pool, text, now))
	}

	fn get_note(&self, note_id: i64) -> BoxFuture<'_, Result<Option<Note>>> {
		Box::pin(notes::get_note(&self.pool, note_id))
	}

	fn update_note_text<'a>(
		&'a self,
		note_id: i64,
		text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<Note>>> {
		Box::pin(notes::update_note_text(&self.pool, note_id, text, now))
	}

	fn delete_note(&self, note_id: i64) -> BoxFuture<'_, Result<bool>> {
		Box::pin(notes::delete_note(&self.pool, note_id))
	}

	fn set_note_embedding<'a>(
		&'a self,
		note_id: i64,
		embedding: Option<&'a [f32]>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(notes::set_note_embedding(&self.pool, note_id, embedding))
	}

	fn recent_notes(&self, limit: u32, offset: u32) -> BoxFuture<'_, Result<Vec<Note>>> {
		Box::pin(notes::recent_notes(&self.pool, limit, offset))
	}

	fn notes_with_embeddings(&self, limit: u32, offset: u32) -> BoxFuture<'_, Result<Vec<Note>>> {
		Box::pin(notes::notes_with_embeddings(&self.pool, limit, offset))
	}

	fn find_tag<'a>(
		&'a self,
		normalized_key: &'a str,
		tag_type: TagType,
	) -> BoxFuture<'a, Result<Option<Tag>>> {
		Box::pin(tags::find_tag(&self.pool, normalized_key, tag_type))
	}

	fn find_tags_by_key<'a>(&'a self, normalized_key: &'a str) -> BoxFuture<'a, Result<Vec<Tag>>> {
		Box::pin(tags::find_tags_by_key(&self.pool, normalized_key))
	}

	fn search_tags<'a>(&'a self, fragment: &'a str) -> BoxFuture<'a, Result<Vec<Tag>>> {
		Box::pin(tags::search_tags(&self.pool, fragment))
	}

	fn create_tag<'a>(
		&'a self,
		display_name: &'a str,
		tag_type: TagType,
		normalized_key: &'a str,
	) -> BoxFuture<'a, Result<Tag>> {
		Box::pin(tags::create_tag(&self.pool, display_name, tag_type, normalized_key))
	}

	fn update_tag_type(&self, tag_id: i64, tag_type: TagType) -> BoxFuture<'_, Result<Tag>> {
		Box::pin(tags::update_tag_type(&self.pool, tag_id, tag_type))
	}

	fn attach_tag<'a>(
		&'a self,
		note_id: i64,
		tag_id: i64,
		value: Option<&'a str>,
		metadata: Option<&'a Value>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(tags::attach_tag(&self.pool, note_id, tag_id, value, metadata))
	}

	fn clear_note_tags(&self, note_id: i64) -> BoxFuture<'_, Result<()>> {
		Box::pin(tags::clear_note_tags(&self.pool, note_id))
	}

	fn tags_for_note(&self, note_id: i64) -> BoxFuture<'_, Result<Vec<AttachedTag>>> {
		Box::pin(tags::tags_for_note(&self.pool, note_id))
	}

	fn notes_for_tags<'a>(
		&'a self,
		tag_ids: &'a [i64],
		mode: TagMatch,
	) -> BoxFuture<'a, Result<Vec<Note>>> {
		Box::pin(notes::notes_for_tags(&self.pool, tag_ids, mode))
	}
}
