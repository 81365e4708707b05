use std::{
	cmp::Ordering,
	sync::{Arc, Mutex, MutexGuard},
};

use recall_config::Retrieval;
use recall_domain::similarity;
use recall_storage::{Note, NoteStore};

use crate::{
	Result,
	similarity_cache::{self, SimilarityCache},
};

#[derive(Clone, Copy, Debug)]
pub struct ScanSettings {
	pub batch_size: u32,
	pub max_batches: u32,
	pub high_confidence_threshold: f32,
	pub fingerprint_prefix_len: usize,
}
impl From<&Retrieval> for ScanSettings {
	fn from(cfg: &Retrieval) -> Self {
		Self {
			batch_size: cfg.scan_batch_size,
			max_batches: cfg.max_scan_batches,
			high_confidence_threshold: cfg.high_confidence_threshold,
			fingerprint_prefix_len: cfg.fingerprint_prefix_len as usize,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredNote {
	pub note: Note,
	pub similarity: f32,
}

struct Scan {
	top: Vec<ScoredNote>,
	failed_batches: u32,
}

/// Nearest-neighbour lookup over stored note embeddings with a result cache in front.
pub struct EmbeddingIndex {
	store: Arc<dyn NoteStore>,
	settings: ScanSettings,
	cache: Mutex<SimilarityCache>,
}
impl EmbeddingIndex {
	pub fn new(store: Arc<dyn NoteStore>, settings: ScanSettings, cache: SimilarityCache) -> Self {
		Self { store, settings, cache: Mutex::new(cache) }
	}

	pub fn settings(&self) -> ScanSettings {
		self.settings
	}

	/// Notes most similar to `vector`, best first, at most `limit` of them.
	///
	/// Without a vector, or when no stored embedding can be scored, this returns the `limit` most
	/// recent notes instead. Only complete similarity scans are cached, and only when the cache was
	/// not cleared while the scan ran.
	pub async fn find_similar(&self, vector: Option<&[f32]>, limit: u32) -> Result<Vec<Note>> {
		if limit == 0 {
			return Ok(Vec::new());
		}

		let Some(vector) = vector else {
			tracing::debug!(limit, "No query vector. Falling back to recent notes.");

			return self.recent(limit).await;
		};
		let key =
			similarity_cache::fingerprint(vector, self.settings.fingerprint_prefix_len, limit);
		let generation = {
			let cache = self.lock_cache();

			if let Some(hit) = cache.get(&key) {
				tracing::debug!(fingerprint = %key, "Similarity cache hit.");

				return Ok(hit.to_vec());
			}

			cache.generation()
		};
		let scan = self.scan(vector, limit).await;

		if scan.top.is_empty() {
			tracing::debug!(
				limit,
				failed_batches = scan.failed_batches,
				"No usable embeddings. Falling back to recent notes."
			);

			return self.recent(limit).await;
		}

		let notes = scan.top.into_iter().map(|scored| scored.note).collect::<Vec<_>>();

		if scan.failed_batches > 0 {
			tracing::debug!(
				failed_batches = scan.failed_batches,
				"Scan was incomplete. Result not cached."
			);

			return Ok(notes);
		}

		let mut cache = self.lock_cache();

		if cache.generation() != generation {
			tracing::debug!(fingerprint = %key, "Cache cleared during scan. Result not cached.");
		} else if let Some(evicted) = cache.insert(key, notes.clone()) {
			tracing::debug!(fingerprint = %evicted, "Similarity cache evicted entry.");
		}

		Ok(notes)
	}

	/// Batched similarity scan without cache or fallback.
	///
	/// A failed batch read is skipped and the scan moves on to the next offset. Notes whose
	/// embedding cannot be compared with `vector` are skipped.
	pub async fn find_similar_scored(&self, vector: &[f32], limit: u32) -> Vec<ScoredNote> {
		self.scan(vector, limit).await.top
	}

	/// Drops every cached result. Called after any write that changes an embedding.
	pub fn invalidate(&self) {
		let mut cache = self.lock_cache();

		if !cache.is_empty() {
			tracing::debug!(entries = cache.len(), "Clearing similarity cache.");
		}

		cache.clear();
	}

	pub fn cached_entries(&self) -> usize {
		self.lock_cache().len()
	}

	async fn scan(&self, vector: &[f32], limit: u32) -> Scan {
		let limit = limit as usize;
		let batch_size = self.settings.batch_size.max(1);
		let mut scan = Scan { top: Vec::with_capacity(limit), failed_batches: 0 };

		if limit == 0 {
			return scan;
		}

		for batch in 0..self.settings.max_batches {
			let offset = batch.saturating_mul(batch_size);
			let notes = match self.store.notes_with_embeddings(batch_size, offset).await {
				Ok(notes) => notes,
				Err(err) => {
					tracing::warn!(batch, error = %err, "Embedding batch read failed. Skipping.");

					scan.failed_batches += 1;

					continue;
				},
			};
			let fetched = notes.len();

			for note in notes {
				let Some(score) = note
					.embedding
					.as_deref()
					.and_then(|embedding| similarity::cosine_similarity(vector, embedding))
				else {
					tracing::debug!(note_id = note.note_id, "Skipping unscorable embedding.");

					continue;
				};

				scan.top.push(ScoredNote { note, similarity: score });
			}

			scan.top.sort_by(|a, b| {
				b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal)
			});
			scan.top.truncate(limit);

			if scan.top.len() == limit
				&& scan.top.last().is_some_and(|weakest| {
					weakest.similarity > self.settings.high_confidence_threshold
				}) {
				tracing::debug!(batch, "Top results are high confidence. Ending scan early.");

				break;
			}
			if fetched < batch_size as usize {
				break;
			}
		}

		scan
	}

	async fn recent(&self, limit: u32) -> Result<Vec<Note>> {
		Ok(self.store.recent_notes(limit, 0).await?)
	}

	fn lock_cache(&self) -> MutexGuard<'_, SimilarityCache> {
		self.cache.lock().unwrap_or_else(|err| err.into_inner())
	}
}
