//! Query pipeline
//!
//! Each question moves through `Resolving → Embedding → Searching →
//! AssemblingContext → Generating → Done`. A failure at any step ends the
//! query with a `QueryError` naming the step.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::call_with_timeout;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    assemble_context, Config, QueryStage, RetrievalAnswer, RetrievedContext, SnapshotId, TenantId,
};
use crate::domain::ports::{AnswerGenerator, EmbeddingProvider, SnapshotStore};
use crate::infrastructure::vector::{IndexCache, VectorIndex};

/// A query that stopped at `stage`
#[derive(Debug, Clone, Error)]
#[error("query failed while {stage}: {source}")]
pub struct QueryError {
    pub stage: QueryStage,
    #[source]
    pub source: DomainError,
}

impl QueryError {
    pub const fn new(stage: QueryStage, source: DomainError) -> Self {
        Self { stage, source }
    }

    fn at(stage: QueryStage) -> impl FnOnce(DomainError) -> Self {
        move |source| Self::new(stage, source)
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Query-time policy
#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub embed_timeout: Duration,
    pub generate_timeout: Duration,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RetrievalOptions {
    fn from(config: &Config) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            embed_timeout: Duration::from_secs(config.embedding.timeout_secs),
            generate_timeout: Duration::from_secs(config.generation.timeout_secs),
        }
    }
}

/// Answers questions from a tenant's snapshots
pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    store: Arc<dyn SnapshotStore>,
    cache: IndexCache,
    options: RetrievalOptions,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
        store: Arc<dyn SnapshotStore>,
        cache: IndexCache,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            embedder,
            generator,
            store,
            cache,
            options,
        }
    }

    /// Query-time policy, including the default `top_k`
    pub const fn options(&self) -> &RetrievalOptions {
        &self.options
    }

    /// Answer from the tenant's latest snapshot.
    pub async fn ask(&self, tenant_id: &TenantId, question: &str) -> QueryResult<RetrievalAnswer> {
        self.answer(tenant_id, None, question).await
    }

    /// Answer from an explicit snapshot; fails with `SnapshotNotFound` while
    /// resolving if it does not exist.
    pub async fn ask_at(
        &self,
        tenant_id: &TenantId,
        snapshot_id: &SnapshotId,
        question: &str,
    ) -> QueryResult<RetrievalAnswer> {
        self.answer(tenant_id, Some(snapshot_id), question).await
    }

    /// Run the pipeline up to context assembly with the configured `top_k`.
    pub async fn retrieve(
        &self,
        tenant_id: &TenantId,
        snapshot_id: Option<&SnapshotId>,
        question: &str,
    ) -> QueryResult<RetrievedContext> {
        self.retrieve_top_k(tenant_id, snapshot_id, question, self.options.top_k)
            .await
    }

    #[instrument(skip(self, tenant_id, question), fields(tenant = %tenant_id))]
    pub async fn retrieve_top_k(
        &self,
        tenant_id: &TenantId,
        snapshot_id: Option<&SnapshotId>,
        question: &str,
        top_k: usize,
    ) -> QueryResult<RetrievedContext> {
        let started = Instant::now();

        // Resolving
        if question.trim().is_empty() {
            return Err(QueryError::new(
                QueryStage::Resolving,
                DomainError::Validation("question cannot be empty".to_string()),
            ));
        }
        let (snapshot_id, index) = self
            .resolve(tenant_id, snapshot_id)
            .await
            .map_err(QueryError::at(QueryStage::Resolving))?;

        // Embedding
        let query_vector = self
            .embed_question(question)
            .await
            .map_err(QueryError::at(QueryStage::Embedding))?;

        // Searching
        let results = index
            .search(&query_vector, top_k)
            .map_err(QueryError::at(QueryStage::Searching))?;

        // AssemblingContext
        let context = assemble_context(&results);

        debug!(
            snapshot_id = %snapshot_id,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieved context"
        );

        Ok(RetrievedContext {
            snapshot_id,
            results,
            context,
        })
    }

    #[instrument(skip(self, tenant_id, question), fields(tenant = %tenant_id))]
    async fn answer(
        &self,
        tenant_id: &TenantId,
        snapshot_id: Option<&SnapshotId>,
        question: &str,
    ) -> QueryResult<RetrievalAnswer> {
        let started = Instant::now();
        let retrieved = self.retrieve(tenant_id, snapshot_id, question).await?;

        // Generating
        let generator = self.generator.name();
        let answer = call_with_timeout(
            self.options.generate_timeout,
            QueryStage::Generating.as_str(),
            generator,
            self.generator.answer(question, &retrieved.context),
        )
        .await
        .map_err(QueryError::at(QueryStage::Generating))?;

        info!(
            snapshot_id = %retrieved.snapshot_id,
            sources = retrieved.results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Answered question"
        );

        Ok(RetrievalAnswer {
            answer,
            snapshot_id: retrieved.snapshot_id,
            sources: retrieved.results,
        })
    }

    /// Pick the snapshot to answer from and load its index.
    async fn resolve(
        &self,
        tenant_id: &TenantId,
        pinned: Option<&SnapshotId>,
    ) -> DomainResult<(SnapshotId, Arc<VectorIndex>)> {
        let snapshot_id = match pinned {
            Some(snapshot_id) => snapshot_id.clone(),
            None => self.store.latest(tenant_id).await?,
        };
        let index = self
            .cache
            .get_or_load(self.store.as_ref(), tenant_id, &snapshot_id)
            .await?;
        Ok((snapshot_id, index))
    }

    async fn embed_question(&self, question: &str) -> DomainResult<Vec<f32>> {
        let provider = self.embedder.name();
        let batch = [question.to_string()];
        let vectors = call_with_timeout(
            self.options.embed_timeout,
            QueryStage::Embedding.as_str(),
            provider,
            self.embedder.embed(&batch),
        )
        .await?;

        match <[Vec<f32>; 1]>::try_from(vectors) {
            Ok([vector]) if !vector.is_empty() => Ok(vector),
            Ok(_) => Err(DomainError::embedding(provider, "returned an empty vector")),
            Err(vectors) => Err(DomainError::embedding(
                provider,
                format!("returned {} vectors for 1 text", vectors.len()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Chunk, EmbeddedChunk};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Maps known texts to fixed vectors
    struct TableEmbedder(HashMap<&'static str, Vec<f32>>);

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        fn name(&self) -> &'static str {
            "table"
        }
        fn dimension(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
            texts
                .iter()
                .map(|t| {
                    self.0
                        .get(t.as_str())
                        .cloned()
                        .ok_or_else(|| DomainError::embedding("table", format!("unknown text {t}")))
                })
                .collect()
        }
        fn max_batch_size(&self) -> usize {
            16
        }
    }

    /// Echoes its context, or sleeps past any deadline
    struct EchoGenerator {
        delay: Option<Duration>,
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl AnswerGenerator for EchoGenerator {
        fn name(&self) -> &'static str {
            "echo"
        }
        async fn answer(&self, question: &str, context: &str) -> DomainResult<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.seen
                .lock()
                .unwrap()
                .push((question.to_string(), context.to_string()));
            Ok(format!("answer from: {context}"))
        }
    }

    /// Single-snapshot in-memory store
    struct MemoryStore {
        snapshot: Option<(SnapshotId, Vec<EmbeddedChunk>)>,
    }

    #[async_trait]
    impl SnapshotStore for MemoryStore {
        fn name(&self) -> &'static str {
            "memory"
        }
        async fn put(&self, _: &TenantId, _: Vec<EmbeddedChunk>) -> DomainResult<SnapshotId> {
            Err(DomainError::storage("put", "read-only"))
        }
        async fn latest(&self, tenant_id: &TenantId) -> DomainResult<SnapshotId> {
            self.snapshot
                .as_ref()
                .map(|(id, _)| id.clone())
                .ok_or_else(|| DomainError::NoIndexForTenant(tenant_id.to_string()))
        }
        async fn load(&self, tenant_id: &TenantId, snapshot_id: &SnapshotId) -> DomainResult<crate::domain::models::Snapshot> {
            match &self.snapshot {
                Some((id, chunks)) if id == snapshot_id => Ok(crate::domain::models::Snapshot::new(
                    id.clone(),
                    tenant_id.clone(),
                    chunks.clone(),
                )),
                _ => Err(DomainError::SnapshotNotFound {
                    tenant_id: tenant_id.to_string(),
                    snapshot_id: snapshot_id.to_string(),
                }),
            }
        }
        async fn list_snapshots(&self, _: &TenantId) -> DomainResult<Vec<SnapshotId>> {
            Ok(self.snapshot.iter().map(|(id, _)| id.clone()).collect())
        }
    }

    fn snapshot_id() -> SnapshotId {
        SnapshotId::parse("20240301T123045Z-000000-0badf00d").unwrap()
    }

    fn service(store: MemoryStore, delay: Option<Duration>) -> (RetrievalService, Arc<EchoGenerator>) {
        let embedder = TableEmbedder(HashMap::from([
            ("cats?", vec![1.0, 0.0]),
            ("dogs?", vec![0.0, 1.0]),
        ]));
        let generator = Arc::new(EchoGenerator {
            delay,
            seen: Mutex::new(Vec::new()),
        });
        let svc = RetrievalService::new(
            Arc::new(embedder),
            generator.clone(),
            Arc::new(store),
            IndexCache::new(4, Duration::from_secs(60)),
            RetrievalOptions {
                top_k: 1,
                embed_timeout: Duration::from_secs(1),
                generate_timeout: Duration::from_millis(50),
            },
        );
        (svc, generator)
    }

    fn populated() -> MemoryStore {
        let chunks = vec![
            EmbeddedChunk::new(Chunk::new(0, "Cats purr.".to_string(), 0, 0), vec![0.9, 0.1]),
            EmbeddedChunk::new(Chunk::new(1, "Dogs bark.".to_string(), 10, 0), vec![0.1, 0.9]),
        ];
        MemoryStore {
            snapshot: Some((snapshot_id(), chunks)),
        }
    }

    fn tenant() -> TenantId {
        TenantId::new("tenant-x").unwrap()
    }

    #[tokio::test]
    async fn test_ask_passes_best_context_to_generator() {
        let (svc, generator) = service(populated(), None);

        let answer = svc.ask(&tenant(), "dogs?").await.unwrap();

        assert_eq!(answer.snapshot_id, snapshot_id());
        assert_eq!(answer.answer, "answer from: Dogs bark.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(
            generator.seen.lock().unwrap().as_slice(),
            &[("dogs?".to_string(), "Dogs bark.".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_index_fails_while_resolving() {
        let (svc, _) = service(MemoryStore { snapshot: None }, None);

        let err = svc.ask(&tenant(), "cats?").await.unwrap_err();
        assert_eq!(err.stage, QueryStage::Resolving);
        assert!(matches!(err.source, DomainError::NoIndexForTenant(ref t) if t == "tenant-x"));
    }

    #[tokio::test]
    async fn test_unloadable_latest_fails_while_resolving() {
        // latest() names a snapshot that load() cannot find
        struct DanglingStore(MemoryStore);

        #[async_trait]
        impl SnapshotStore for DanglingStore {
            fn name(&self) -> &'static str {
                "dangling"
            }
            async fn put(&self, t: &TenantId, c: Vec<EmbeddedChunk>) -> DomainResult<SnapshotId> {
                self.0.put(t, c).await
            }
            async fn latest(&self, _: &TenantId) -> DomainResult<SnapshotId> {
                Ok(snapshot_id())
            }
            async fn load(&self, t: &TenantId, s: &SnapshotId) -> DomainResult<crate::domain::models::Snapshot> {
                self.0.load(t, s).await
            }
            async fn list_snapshots(&self, t: &TenantId) -> DomainResult<Vec<SnapshotId>> {
                self.0.list_snapshots(t).await
            }
        }

        let (mut svc, generator) = service(populated(), None);
        svc.store = Arc::new(DanglingStore(MemoryStore { snapshot: None }));

        let err = svc.ask(&tenant(), "cats?").await.unwrap_err();
        assert_eq!(err.stage, QueryStage::Resolving);
        assert!(matches!(err.source, DomainError::SnapshotNotFound { .. }));
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let (svc, _) = service(populated(), None);

        let err = svc.ask(&tenant(), "   ").await.unwrap_err();
        assert_eq!(err.stage, QueryStage::Resolving);
        assert!(matches!(err.source, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_ask_at_unknown_snapshot() {
        let (svc, _) = service(populated(), None);
        let missing = SnapshotId::parse("20240301T123045Z-000001-0badf00d").unwrap();

        let err = svc.ask_at(&tenant(), &missing, "cats?").await.unwrap_err();
        assert_eq!(err.stage, QueryStage::Resolving);
        assert!(matches!(err.source, DomainError::SnapshotNotFound { .. }));

        let answer = svc.ask_at(&tenant(), &snapshot_id(), "cats?").await.unwrap();
        assert_eq!(answer.sources[0].ordinal(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_names_stage() {
        let (svc, _) = service(populated(), None);

        let err = svc.ask(&tenant(), "birds?").await.unwrap_err();
        assert_eq!(err.stage, QueryStage::Embedding);
        assert!(err.to_string().starts_with("query failed while embedding:"));
    }

    #[tokio::test]
    async fn test_generation_timeout_fails_at_generating() {
        let (svc, _) = service(populated(), Some(Duration::from_secs(5)));

        let err = svc.ask(&tenant(), "cats?").await.unwrap_err();
        assert_eq!(err.stage, QueryStage::Generating);
        match err.source {
            DomainError::Timeout {
                collaborator,
                timeout_ms,
                ..
            } => {
                assert_eq!(collaborator, "echo");
                assert_eq!(timeout_ms, 50);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retrieve_skips_generation() {
        let (svc, generator) = service(populated(), None);

        let retrieved = svc.retrieve_top_k(&tenant(), None, "cats?", 5).await.unwrap();

        assert_eq!(retrieved.results.len(), 2);
        assert_eq!(retrieved.context, "Cats purr.\n\nDogs bark.");
        assert!(generator.seen.lock().unwrap().is_empty());

        let err = svc.retrieve_top_k(&tenant(), None, "cats?", 0).await.unwrap_err();
        assert_eq!(err.stage, QueryStage::Searching);
    }
}
