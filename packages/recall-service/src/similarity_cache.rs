use std::collections::{HashMap, VecDeque};

use recall_storage::Note;

/// Bounded map from query fingerprints to similarity results.
///
/// Eviction is by insertion order: when a new key would exceed the capacity, the oldest key is
/// dropped. Writing an existing key replaces its value and keeps its position. A capacity of zero
/// disables caching.
///
/// Every [`SimilarityCache::clear`] starts a new generation, so a writer that read the generation
/// before a clear can tell its result is out of date.
#[derive(Debug)]
pub struct SimilarityCache {
	capacity: usize,
	entries: HashMap<String, Vec<Note>>,
	order: VecDeque<String>,
	generation: u64,
}
impl SimilarityCache {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			entries: HashMap::with_capacity(capacity),
			order: VecDeque::new(),
			generation: 0,
		}
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn get(&self, fingerprint: &str) -> Option<&[Note]> {
		self.entries.get(fingerprint).map(Vec::as_slice)
	}

	pub fn contains(&self, fingerprint: &str) -> bool {
		self.entries.contains_key(fingerprint)
	}

	/// Returns the evicted fingerprint, if any.
	pub fn insert(&mut self, fingerprint: String, notes: Vec<Note>) -> Option<String> {
		if self.capacity == 0 {
			return None;
		}
		if let Some(existing) = self.entries.get_mut(&fingerprint) {
			*existing = notes;

			return None;
		}

		let evicted = if self.order.len() >= self.capacity {
			self.order.pop_front().inspect(|oldest| {
				self.entries.remove(oldest);
			})
		} else {
			None
		};

		self.order.push_back(fingerprint.clone());
		self.entries.insert(fingerprint, notes);

		evicted
	}

	pub fn clear(&mut self) {
		self.entries.clear();
		self.order.clear();

		self.generation = self.generation.wrapping_add(1);
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Cache key for a query vector: a blake3 digest over the first `prefix_len` components and the
/// requested limit.
pub fn fingerprint(vector: &[f32], prefix_len: usize, limit: u32) -> String {
	let mut hasher = blake3::Hasher::new();

	for value in vector.iter().take(prefix_len) {
		hasher.update(&value.to_le_bytes());
	}

	hasher.update(b"|");
	hasher.update(&limit.to_le_bytes());

	hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fingerprint_ignores_components_past_the_prefix() {
		let a = fingerprint(&[0.1, 0.2, 0.3], 2, 5);
		let b = fingerprint(&[0.1, 0.2, 0.9], 2, 5);

		assert_eq!(a, b);
		assert_ne!(a, fingerprint(&[0.1, 0.2, 0.3], 2, 6));
		assert_ne!(a, fingerprint(&[0.1, 0.25, 0.3], 2, 5));
	}

	#[test]
	fn overwrite_keeps_insertion_position() {
		let mut cache = SimilarityCache::new(2);

		cache.insert("a".to_string(), Vec::new());
		cache.insert("b".to_string(), Vec::new());
		cache.insert("a".to_string(), Vec::new());

		assert_eq!(cache.insert("c".to_string(), Vec::new()).as_deref(), Some("a"));
		assert!(cache.contains("b"));
	}

	#[test]
	fn clear_starts_a_new_generation() {
		let mut cache = SimilarityCache::new(2);
		let before = cache.generation();

		cache.insert("a".to_string(), Vec::new());
		cache.clear();

		assert!(cache.is_empty());
		assert_ne!(cache.generation(), before);
	}

	#[test]
	fn zero_capacity_stores_nothing() {
		let mut cache = SimilarityCache::new(0);

		cache.insert("a".to_string(), Vec::new());

		assert!(cache.is_empty());
	}
}
