use serde_json::Value;
use sqlx::PgPool;

use recall_domain::TagType;

use crate::{
	AttachedTag, Error, Result, Tag,
	models::{AttachedTagRow, TagRow},
};

const TAG_COLUMNS: &str = "tag_id, display_name, tag_type, normalized_key";

pub async fn find_tag(
	pool: &PgPool,
	normalized_key: &str,
	tag_type: TagType,
) -> Result<Option<Tag>> {
	let row = sqlx::query_as::<_, TagRow>(&format!(
		"\
SELECT {TAG_COLUMNS}
FROM tags
WHERE normalized_key = $1
	AND tag_type = $2"
	))
	.bind(normalized_key)
	.bind(tag_type.as_str())
	.fetch_optional(pool)
	.await?;

	Ok(row.map(Tag::from))
}

pub async fn find_tags_by_key(pool: &PgPool, normalized_key: &str) -> Result<Vec<Tag>> {
	let rows = sqlx::query_as::<_, TagRow>(&format!(
		"\
SELECT {TAG_COLUMNS}
FROM tags
WHERE normalized_key = $1
ORDER BY tag_id"
	))
	.bind(normalized_key)
	.fetch_all(pool)
	.await?;

	Ok(rows.into_iter().map(Tag::from).collect())
}

pub async fn search_tags(pool: &PgPool, fragment: &str) -> Result<Vec<Tag>> {
	let pattern = format!("%{}%", escape_like(fragment.trim()));
	let rows = sqlx::query_as::<_, TagRow>(&format!(
		"\
SELECT {TAG_COLUMNS}
FROM tags
WHERE display_name ILIKE $1 ESCAPE '\\'
	OR normalized_key ILIKE $1 ESCAPE '\\'
ORDER BY tag_id"
	))
	.bind(pattern)
	.fetch_all(pool)
	.await?;

	Ok(rows.into_iter().map(Tag::from).collect())
}

pub async fn create_tag(
	pool: &PgPool,
	display_name: &str,
	tag_type: TagType,
	normalized_key: &str,
) -> Result<Tag> {
	if normalized_key.is_empty() {
		return Err(Error::InvalidArgument("tag normalized_key must not be empty".to_string()));
	}

	let row = sqlx::query_as::<_, TagRow>(&format!(
		"\
INSERT INTO tags (display_name, tag_type, normalized_key)
VALUES ($1, $2, $3)
RETURNING {TAG_COLUMNS}"
	))
	.bind(display_name)
	.bind(tag_type.as_str())
	.bind(normalized_key)
	.fetch_one(pool)
	.await?;

	Ok(row.into())
}

pub async fn update_tag_type(pool: &PgPool, tag_id: i64, tag_type: TagType) -> Result<Tag> {
	let row = sqlx::query_as::<_, TagRow>(&format!(
		"\
UPDATE tags
SET
	tag_type = $2,
	updated_at = now()
WHERE tag_id = $1
RETURNING {TAG_COLUMNS}"
	))
	.bind(tag_id)
	.bind(tag_type.as_str())
	.fetch_optional(pool)
	.await?;

	row.map(Tag::from).ok_or_else(|| Error::NotFound(format!("tag not found; tag_id={tag_id}")))
}

pub async fn attach_tag(
	pool: &PgPool,
	note_id: i64,
	tag_id: i64,
	value: Option<&str>,
	metadata: Option<&Value>,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO note_tags (note_id, tag_id, value, metadata)
VALUES ($1, $2, $3, $4)
ON CONFLICT (note_id, tag_id) DO UPDATE
SET
	value = EXCLUDED.value,
	metadata = EXCLUDED.metadata",
	)
	.bind(note_id)
	.bind(tag_id)
	.bind(value)
	.bind(metadata)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn clear_note_tags(pool: &PgPool, note_id: i64) -> Result<()> {
	sqlx::query("DELETE FROM note_tags WHERE note_id = $1").bind(note_id).execute(pool).await?;

	Ok(())
}

pub async fn tags_for_note(pool: &PgPool, note_id: i64) -> Result<Vec<AttachedTag>> {
	let rows = sqlx::query_as::<_, AttachedTagRow>(
		"\
SELECT
	t.tag_id,
	t.display_name,
	t.tag_type,
	t.normalized_key,
	nt.value,
	nt.metadata
FROM note_tags nt
JOIN tags t ON t.tag_id = nt.tag_id
WHERE nt.note_id = $1
ORDER BY t.tag_id",
	)
	.bind(note_id)
	.fetch_all(pool)
	.await?;

	Ok(rows.into_iter().map(AttachedTag::from).collect())
}

fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}
