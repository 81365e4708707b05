pub mod embedding_index;
pub mod interpreter;
pub mod notes;
pub mod query;
pub mod resolver;
pub mod similarity_cache;
pub mod synthesizer;
pub mod tag_graph;

mod error;

pub use embedding_index::{EmbeddingIndex, ScanSettings, ScoredNote};
pub use error::{Error, Result};
pub use interpreter::{QueryInterpreter, QueryPlan};
pub use notes::IngestedNote;
pub use query::{NO_MATCHES_SUMMARY, QueryAnswer};
pub use recall_storage::BoxFuture;
pub use resolver::EntityResolver;
pub use similarity_cache::SimilarityCache;
pub use synthesizer::{LlmSynthesizer, Synthesis};
pub use tag_graph::TagGraph;

use std::sync::Arc;

use recall_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use recall_providers::{embedding, extractor, extractor::Extraction, generation};
use recall_storage::{Note, NoteStore};

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, recall_providers::Result<Vec<Vec<f32>>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system_prompt: &'a str,
		user_prompt: &'a str,
	) -> BoxFuture<'a, recall_providers::Result<String>>;
}

pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, recall_providers::Result<Extraction>>;
}

/// Produces the summary for a set of candidate notes. Must not fail: degraded answers are
/// returned as text.
pub trait AnswerStrategy
where
	Self: Send + Sync,
{
	fn answer<'a>(&'a self, query: &'a str, candidates: &'a [Note]) -> BoxFuture<'a, Synthesis>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
	pub extractor: Arc<dyn ExtractorProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		generation: Arc<dyn GenerationProvider>,
		extractor: Arc<dyn ExtractorProvider>,
	) -> Self {
		Self { embedding, generation, extractor }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), generation: provider.clone(), extractor: provider }
	}
}

/// The retrieval engine. One instance serves all requests; the similarity cache inside the
/// embedding index is shared between them.
pub struct RecallService {
	pub cfg: Config,
	pub store: Arc<dyn NoteStore>,
	pub providers: Providers,
	pub answerer: Arc<dyn AnswerStrategy>,
	pub index: EmbeddingIndex,
}
impl RecallService {
	pub fn new(cfg: Config, store: Arc<dyn NoteStore>) -> Self {
		Self::with_providers(cfg, store, Providers::default())
	}

	/// Uses [`LlmSynthesizer`] over the given generation provider for answers.
	pub fn with_providers(cfg: Config, store: Arc<dyn NoteStore>, providers: Providers) -> Self {
		let answerer =
			Arc::new(LlmSynthesizer::new(cfg.providers.llm.clone(), providers.generation.clone()));

		Self::with_parts(cfg, store, providers, answerer)
	}

	pub fn with_parts(
		cfg: Config,
		store: Arc<dyn NoteStore>,
		providers: Providers,
		answerer: Arc<dyn AnswerStrategy>,
	) -> Self {
		let cache = SimilarityCache::new(cfg.retrieval.cache_capacity as usize);
		let index = EmbeddingIndex::new(store.clone(), ScanSettings::from(&cfg.retrieval), cache);

		Self { cfg, store, providers, answerer, index }
	}

	pub fn resolver(&self) -> EntityResolver<'_> {
		EntityResolver::new(self.store.as_ref())
	}

	pub fn tag_graph(&self) -> TagGraph<'_> {
		TagGraph::new(self.store.as_ref())
	}

	pub fn interpreter(&self) -> QueryInterpreter<'_> {
		QueryInterpreter::new(&self.cfg, &self.providers, self.store.as_ref())
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, recall_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl GenerationProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system_prompt: &'a str,
		user_prompt: &'a str,
	) -> BoxFuture<'a, recall_providers::Result<String>> {
		Box::pin(generation::complete(cfg, system_prompt, user_prompt))
	}
}
impl ExtractorProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, recall_providers::Result<Extraction>> {
		Box::pin(extractor::extract(cfg, text))
	}
}
