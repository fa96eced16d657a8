//! Case corpus ingestion
//!
//! Rebuilds the vector index from QA datasets: delete-if-exists, create,
//! then embed and upsert every dataset in fixed-size batches.

pub mod datasets;

pub use datasets::{
    default_datasets, format_question_answer, load_dataset, load_dataset_safe, DatasetSpec,
    HubFile, Record, LAVITA, MEDQA,
};

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::{ClinicalError, Result};
use crate::providers::{DeleteOutcome, EmbeddingProvider, IndexSpec, VectorIndex, VectorStore};
use crate::types::{CaseMetadata, CaseRecord};

/// Records per upsert call
pub const BATCH_SIZE: usize = 100;

/// Rows taken from each dataset
pub const MAX_RECORDS_PER_DATASET: usize = 1000;

/// Ingestion run settings
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub batch_size: usize,
    pub max_records: usize,
    /// Dataset label -> local JSONL or parquet file used instead of the Hub
    pub local_files: HashMap<String, PathBuf>,
    pub show_progress: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            max_records: MAX_RECORDS_PER_DATASET,
            local_files: HashMap::new(),
            show_progress: false,
        }
    }
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// (dataset label, records ingested)
    pub ingested: Vec<(String, usize)>,
    pub skipped: Vec<String>,
    pub total: usize,
}

/// Drop any existing index with this name and create it fresh
pub async fn setup_index(store: &dyn VectorStore, spec: &IndexSpec) -> Result<Arc<dyn VectorIndex>> {
    if store.delete_index_if_exists(&spec.name).await? == DeleteOutcome::Deleted {
        info!(index = %spec.name, "deleted existing index");
    }
    store.create_index(spec).await?;
    store.open_index(&spec.name).await
}

fn progress_bar(len: usize, label: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} | ETA: {eta}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_message(label.to_string());
    pb
}

/// Embed and upsert one dataset. Ids are `{id_prefix}_{row}`.
pub async fn ingest_dataset(
    index: &dyn VectorIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    records: &[Record],
    spec: &DatasetSpec,
    batch_size: usize,
    progress: &ProgressBar,
) -> Result<usize> {
    if batch_size == 0 {
        return Err(ClinicalError::Config("batch size must be greater than 0".to_string()));
    }

    info!(dataset = spec.label, records = records.len(), "embedding and ingesting");
    let mut total = 0;

    for (chunk_no, chunk) in records.chunks(batch_size).enumerate() {
        let first_row = chunk_no * batch_size;
        let mut rows = Vec::with_capacity(chunk.len());
        for (offset, record) in chunk.iter().enumerate() {
            rows.push(spec.extract(first_row + offset, record)?);
        }

        let texts: Vec<String> = rows.iter().map(|(_, _, text)| text.clone()).collect();
        let embedder = Arc::clone(&embedder);
        let vectors = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            embedder.embed_batch(&refs)
        })
        .await
        .map_err(|e| ClinicalError::embedding(format!("Embedding task failed: {}", e)))??;

        if vectors.len() != rows.len() {
            return Err(ClinicalError::embedding(format!(
                "expected {} embeddings, got {}",
                rows.len(),
                vectors.len()
            )));
        }

        let batch: Vec<CaseRecord> = rows
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(offset, ((question, answer, text), vector))| CaseRecord {
                id: spec.record_id(first_row + offset),
                vector,
                metadata: CaseMetadata {
                    text,
                    question,
                    answer,
                    source: spec.source.to_string(),
                },
            })
            .collect();

        let count = batch.len();
        index.upsert(batch).await?;
        total += count;
        progress.inc(count as u64);
        info!(dataset = spec.label, ingested = total, of = records.len(), "upserted batch");
    }

    info!(dataset = spec.label, total, "completed ingestion");
    Ok(total)
}

/// Rebuild the index and ingest every dataset that loads
pub async fn run_ingestion(
    store: &dyn VectorStore,
    embedder: Arc<dyn EmbeddingProvider>,
    index_spec: &IndexSpec,
    datasets: &[DatasetSpec],
    options: &IngestOptions,
) -> Result<IngestSummary> {
    if embedder.dimension() != index_spec.dimension {
        return Err(ClinicalError::DimensionMismatch {
            expected: index_spec.dimension,
            actual: embedder.dimension(),
        });
    }

    let index = setup_index(store, index_spec).await?;
    let mut summary = IngestSummary::default();

    for spec in datasets {
        let local = options.local_files.get(spec.label).cloned();
        let max_records = options.max_records;
        let loader_spec = spec.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            load_dataset_safe(&loader_spec, local.as_deref(), max_records)
        })
        .await
        .map_err(|e| ClinicalError::Dataset(format!("Dataset loader task failed: {}", e)))?;

        let Some(records) = loaded else {
            summary.skipped.push(spec.label.to_string());
            continue;
        };

        let progress = progress_bar(records.len(), spec.label, options.show_progress);
        let count = ingest_dataset(
            index.as_ref(),
            Arc::clone(&embedder),
            &records,
            spec,
            options.batch_size,
            &progress,
        )
        .await?;
        progress.finish();

        summary.ingested.push((spec.label.to_string(), count));
        summary.total += count;
    }

    if summary.total == 0 {
        warn!("no datasets were ingested, check dataset configuration");
    } else {
        info!(total = summary.total, "ingestion complete");
    }

    Ok(summary)
}
