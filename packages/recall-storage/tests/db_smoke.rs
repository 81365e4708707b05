use serde_json::json;
use time::{Duration, OffsetDateTime, macros::datetime};

use recall_domain::TagType;
use recall_storage::{Error, Note, NoteStore, TagMatch, db::Db};
use recall_testkit::TestDatabase;

const T0: OffsetDateTime = datetime!(2026-01-01 00:00 UTC);

async fn scratch(test: &str) -> Option<(TestDatabase, Db)> {
	let test_db = TestDatabase::from_env(test).await.expect("Failed to create test database.")?;
	let db = test_db.store().await.expect("Failed to open store.");

	Some((test_db, db))
}

fn ids(notes: &[Note]) -> Vec<i64> {
	notes.iter().map(|note| note.note_id).collect()
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set RECALL_PG_DSN to run."]
async fn schema_bootstrap_is_idempotent() {
	let Some((test_db, db)) = scratch("schema_bootstrap_is_idempotent").await else {
		return;
	};

	db.ensure_schema().await.expect("Second bootstrap should succeed.");

	for table in ["notes", "tags", "note_tags"] {
		let count: i64 = sqlx::query_scalar(
			"SELECT count(*) FROM information_schema.tables WHERE table_name = $1",
		)
		.bind(table)
		.fetch_one(&db.pool)
		.await
		.expect("Failed to query schema tables.");

		assert_eq!(count, 1, "missing table {table}");
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set RECALL_PG_DSN to run."]
async fn duplicate_key_and_type_is_a_conflict() {
	let Some((test_db, db)) = scratch("duplicate_key_and_type_is_a_conflict").await else {
		return;
	};
	let first =
		db.create_tag("Paris", TagType::Place, "paris").await.expect("Failed to create tag.");
	let err = db
		.create_tag("paris", TagType::Place, "paris")
		.await
		.expect_err("Duplicate tag must be rejected.");

	assert!(matches!(err, Error::Conflict(_)), "unexpected error: {err:?}");

	let other =
		db.create_tag("Paris", TagType::Person, "paris").await.expect("Other type is allowed.");

	assert_ne!(first.tag_id, other.tag_id);
	assert_eq!(db.find_tags_by_key("paris").await.expect("Lookup failed.").len(), 2);

	let upgraded = db.update_tag_type(first.tag_id, TagType::Organization).await.expect("Update.");

	assert_eq!(upgraded.tag_id, first.tag_id);
	assert_eq!(upgraded.tag_type, TagType::Organization);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set RECALL_PG_DSN to run."]
async fn tag_matching_and_recency_order() {
	let Some((test_db, db)) = scratch("tag_matching_and_recency_order").await else {
		return;
	};
	let older = db.insert_note("Walked along the river.", T0).await.expect("Insert.");
	let newer = db
		.insert_note("Ran along the river in Paris.", T0 + Duration::hours(1))
		.await
		.expect("Insert.");
	let river = db.create_tag("river", TagType::Place, "river").await.expect("Tag.");
	let paris = db.create_tag("Paris", TagType::Place, "paris").await.expect("Tag.");

	db.attach_tag(older.note_id, river.tag_id, None, None).await.expect("Attach.");
	db.attach_tag(newer.note_id, river.tag_id, None, None).await.expect("Attach.");
	db.attach_tag(newer.note_id, paris.tag_id, Some("city"), Some(&json!({ "country": "FR" })))
		.await
		.expect("Attach.");

	let any = db.notes_for_tags(&[river.tag_id, paris.tag_id], TagMatch::Any).await.expect("Any.");
	let all = db.notes_for_tags(&[river.tag_id, paris.tag_id], TagMatch::All).await.expect("All.");

	assert_eq!(ids(&any), vec![newer.note_id, older.note_id]);
	assert_eq!(ids(&all), vec![newer.note_id]);

	let recent = db.recent_notes(10, 0).await.expect("Recent.");

	assert_eq!(recent[0].note_id, newer.note_id);

	let attached = db.tags_for_note(newer.note_id).await.expect("Tags.");
	let city = attached.iter().find(|t| t.tag.tag_id == paris.tag_id).expect("Paris attached.");

	assert_eq!(city.value.as_deref(), Some("city"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set RECALL_PG_DSN to run."]
async fn deleting_a_note_cascades_and_embeddings_round_trip() {
	let Some((test_db, db)) = scratch("deleting_a_note_cascades_and_embeddings_round_trip").await
	else {
		return;
	};
	let note = db.insert_note("Coffee with Ana.", T0).await.expect("Insert.");
	let tag = db.create_tag("Ana", TagType::Person, "ana").await.expect("Tag.");

	db.attach_tag(note.note_id, tag.tag_id, None, None).await.expect("Attach.");
	db.set_note_embedding(note.note_id, Some(&[0.5_f32, 0.5][..])).await.expect("Embed.");

	let with_vectors = db.notes_with_embeddings(25, 0).await.expect("Scan.");

	assert_eq!(with_vectors.len(), 1);
	assert_eq!(with_vectors[0].embedding.as_deref(), Some(&[0.5_f32, 0.5][..]));
	assert!(db.delete_note(note.note_id).await.expect("Delete."));
	assert!(!db.delete_note(note.note_id).await.expect("Second delete."));

	let orphaned: i64 = sqlx::query_scalar("SELECT count(*) FROM note_tags")
		.fetch_one(&db.pool)
		.await
		.expect("Count.");

	assert_eq!(orphaned, 0);

	let err = db.set_note_embedding(note.note_id, None).await.expect_err("Missing note.");

	assert!(matches!(err, Error::NotFound(_)));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
