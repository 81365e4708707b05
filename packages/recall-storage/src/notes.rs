use sqlx::PgPool;
use time::OffsetDateTime;

use crate::{Error, Note, Result, TagMatch};

const NOTE_COLUMNS: &str = "note_id, text, created_at, updated_at, embedding";

pub async fn insert_note(pool: &PgPool, text: &str, now: OffsetDateTime) -> Result<Note> {
	let note = sqlx::query_as::<_, Note>(&format!(
		"\
INSERT INTO notes (text, created_at, updated_at)
VALUES ($1, $2, $2)
RETURNING {NOTE_COLUMNS}"
	))
	.bind(text)
	.bind(now)
	.fetch_one(pool)
	.await?;

	Ok(note)
}

pub async fn get_note(pool: &PgPool, note_id: i64) -> Result<Option<Note>> {
	let note =
		sqlx::query_as::<_, Note>(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE note_id = $1"))
			.bind(note_id)
			.fetch_optional(pool)
			.await?;

	Ok(note)
}

pub async fn update_note_text(
	pool: &PgPool,
	note_id: i64,
	text: &str,
	now: OffsetDateTime,
) -> Result<Option<Note>> {
	let note = sqlx::query_as::<_, Note>(&format!(
		"\
UPDATE notes
SET
	text = $2,
	updated_at = $3
WHERE note_id = $1
RETURNING {NOTE_COLUMNS}"
	))
	.bind(note_id)
	.bind(text)
	.bind(now)
	.fetch_optional(pool)
	.await?;

	Ok(note)
}

pub async fn delete_note(pool: &PgPool, note_id: i64) -> Result<bool> {
	let res =
		sqlx::query("DELETE FROM notes WHERE note_id = $1").bind(note_id).execute(pool).await?;

	Ok(res.rows_affected() > 0)
}

pub async fn set_note_embedding(
	pool: &PgPool,
	note_id: i64,
	embedding: Option<&[f32]>,
) -> Result<()> {
	let res = sqlx::query("UPDATE notes SET embedding = $2 WHERE note_id = $1")
		.bind(note_id)
		.bind(embedding)
		.execute(pool)
		.await?;

	if res.rows_affected() == 0 {
		return Err(Error::NotFound(format!("note not found; note_id={note_id}")));
	}

	Ok(())
}

pub async fn recent_notes(pool: &PgPool, limit: u32, offset: u32) -> Result<Vec<Note>> {
	let notes = sqlx::query_as::<_, Note>(&format!(
		"\
SELECT {NOTE_COLUMNS}
FROM notes
ORDER BY created_at DESC, note_id DESC
LIMIT $1 OFFSET $2"
	))
	.bind(i64::from(limit))
	.bind(i64::from(offset))
	.fetch_all(pool)
	.await?;

	Ok(notes)
}

pub async fn notes_with_embeddings(pool: &PgPool, limit: u32, offset: u32) -> Result<Vec<Note>> {
	let notes = sqlx::query_as::<_, Note>(&format!(
		"\
SELECT {NOTE_COLUMNS}
FROM notes
WHERE embedding IS NOT NULL
ORDER BY created_at DESC, note_id DESC
LIMIT $1 OFFSET $2"
	))
	.bind(i64::from(limit))
	.bind(i64::from(offset))
	.fetch_all(pool)
	.await?;

	Ok(notes)
}

pub async fn notes_for_tags(pool: &PgPool, tag_ids: &[i64], mode: TagMatch) -> Result<Vec<Note>> {
	let mut distinct = tag_ids.to_vec();

	distinct.sort_unstable();
	distinct.dedup();

	if distinct.is_empty() {
		return Ok(Vec::new());
	}

	let sql = match mode {
		TagMatch::Any => format!(
			"\
SELECT {NOTE_COLUMNS}
FROM notes n
WHERE EXISTS (
	SELECT 1
	FROM note_tags nt
	WHERE nt.note_id = n.note_id
		AND nt.tag_id = ANY($1::bigint[])
)
ORDER BY n.created_at DESC, n.note_id DESC"
		),
		TagMatch::All => format!(
			"\
SELECT {NOTE_COLUMNS}
FROM notes n
WHERE (
	SELECT COUNT(DISTINCT nt.tag_id)
	FROM note_tags nt
	WHERE nt.note_id = n.note_id
		AND nt.tag_id = ANY($1::bigint[])
) = $2
ORDER BY n.created_at DESC, n.note_id DESC"
		),
	};
	let mut query = sqlx::query_as::<_, Note>(&sql).bind(&distinct);

	if mode == TagMatch::All {
		query = query.bind(distinct.len() as i64);
	}

	let notes = query.fetch_all(pool).await?;

	Ok(notes)
}
