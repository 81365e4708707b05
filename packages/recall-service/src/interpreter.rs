use recall_config::{Config, RetrievalStrategy};
use recall_domain::normalize;
use recall_storage::NoteStore;

use crate::{Error, Providers, Result, resolver};

/// How a question is turned into candidate lookups.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryPlan {
	/// Normalized tag keys, deduplicated, in first-seen order.
	Tags { tag_names: Vec<String> },
	/// `None` when the query could not be embedded.
	Vector { vector: Option<Vec<f32>> },
}

pub struct QueryInterpreter<'a> {
	cfg: &'a Config,
	providers: &'a Providers,
	store: &'a dyn NoteStore,
}
impl<'a> QueryInterpreter<'a> {
	pub fn new(cfg: &'a Config, providers: &'a Providers, store: &'a dyn NoteStore) -> Self {
		Self { cfg, providers, store }
	}

	pub async fn interpret(&self, query: &str) -> Result<QueryPlan> {
		let query = query.trim();

		if query.is_empty() {
			return Err(Error::ParseFailure { message: "Query is empty.".to_string() });
		}

		match self.cfg.retrieval.strategy {
			RetrievalStrategy::Tags => self.tag_plan(query).await,
			RetrievalStrategy::Embedding => Ok(self.vector_plan(query).await),
		}
	}

	/// Looks up the tag for every name by exact normalized key. Unknown names are dropped.
	pub async fn resolve_tag_ids(&self, tag_names: &[String]) -> Result<Vec<i64>> {
		let mut tag_ids = Vec::with_capacity(tag_names.len());

		for name in tag_names {
			let tags = self.store.find_tags_by_key(name).await?;

			match resolver::most_specific(tags) {
				Some(tag) if !tag_ids.contains(&tag.tag_id) => tag_ids.push(tag.tag_id),
				Some(_) => {},
				None => tracing::debug!(name, "No tag for query term."),
			}
		}

		Ok(tag_ids)
	}

	async fn tag_plan(&self, query: &str) -> Result<QueryPlan> {
		let extraction = self
			.providers
			.extractor
			.extract(&self.cfg.providers.llm, query)
			.await
			.map_err(|err| Error::ParseFailure { message: err.to_string() })?;
		let names = extraction
			.entities
			.iter()
			.map(|entity| entity.name.as_str())
			.chain(extraction.relations.iter().flat_map(|relation| {
				[relation.subject.as_str(), relation.relation.as_str(), relation.object.as_str()]
			}));

		Ok(QueryPlan::Tags { tag_names: normalize::normalize_all(names) })
	}

	async fn vector_plan(&self, query: &str) -> QueryPlan {
		let texts = [query.to_string()];
		let embedded = self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await;
		let vector = match embedded {
			Ok(mut vectors) if !vectors.is_empty() => Some(vectors.swap_remove(0)),
			Ok(_) => {
				tracing::warn!("Embedding provider returned no vector for the query.");

				None
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					"Query embedding failed. Falling back to recent notes."
				);

				None
			},
		};

		QueryPlan::Vector { vector }
	}
}
