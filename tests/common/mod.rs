//! Common test utilities for integration tests
//!
//! Shared fixtures and stub collaborators used across the integration
//! test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use docsnap::adapters::fs::FsSnapshotStore;
use docsnap::adapters::sqlite::SqliteSnapshotStore;
use docsnap::domain::errors::{DomainError, DomainResult};
use docsnap::domain::models::{Chunk, EmbeddedChunk, TenantId};
use docsnap::domain::ports::{AnswerGenerator, EmbeddingProvider, SnapshotStore};

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

pub fn tenant(name: &str) -> TenantId {
    TenantId::new(name).expect("valid tenant id")
}

/// Embedded chunks with the given texts and 2-d vectors
pub fn embedded(items: &[(&str, [f32; 2])]) -> Vec<EmbeddedChunk> {
    items
        .iter()
        .enumerate()
        .map(|(i, (text, vector))| {
            EmbeddedChunk::new(Chunk::new(i, (*text).to_string(), 0, 0), vector.to_vec())
        })
        .collect()
}

/// A store of each backend, each rooted in its own temporary directory
pub async fn stores() -> Vec<(Arc<dyn SnapshotStore>, TempDir)> {
    let fs_dir = temp_dir();
    let fs_store: Arc<dyn SnapshotStore> = Arc::new(FsSnapshotStore::new(fs_dir.path()));

    let db_dir = temp_dir();
    let db_path = db_dir.path().join("snapshots.db");
    let sqlite_store: Arc<dyn SnapshotStore> = Arc::new(
        SqliteSnapshotStore::open(db_path.to_str().expect("utf-8 temp path"))
            .await
            .expect("Failed to open sqlite store"),
    );

    vec![(fs_store, fs_dir), (sqlite_store, db_dir)]
}

/// Generator that records every call and answers with a fixed string
#[derive(Default)]
pub struct RecordingGenerator {
    pub calls: Mutex<Vec<(String, String)>>,
    pub delay: Option<Duration>,
}

impl RecordingGenerator {
    pub fn slow(delay: Duration) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn last_context(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|(_, context)| context.clone())
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn answer(&self, question: &str, context: &str) -> DomainResult<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push((question.to_string(), context.to_string()));
        Ok(format!("answered: {question}"))
    }
}

/// Embedder that fails on the `fail_on`-th call (0-based), else delegates
pub struct FlakyEmbedder<E> {
    pub inner: E,
    pub fail_on: usize,
    pub calls: AtomicUsize,
}

impl<E> FlakyEmbedder<E> {
    pub fn new(inner: E, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for FlakyEmbedder<E> {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_on {
            return Err(DomainError::embedding("flaky", "service unavailable"));
        }
        self.inner.embed(texts).await
    }

    fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size()
    }
}
