// Dataset sources for the case corpus
use arrow::json::ArrayWriter;
use hf_hub::{api::sync::Api, Repo, RepoType};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::errors::{ClinicalError, Result};

/// One JSON object per dataset row
pub type Record = Map<String, Value>;

/// Renders a question/answer pair as the indexed case text
pub type Formatter = fn(&str, &str) -> String;

pub fn format_question_answer(question: &str, answer: &str) -> String {
    format!("Question: {} Answer: {}", question, answer)
}

/// Branch holding the Hub's automatic parquet conversion of every dataset
pub const PARQUET_REVISION: &str = "refs/convert/parquet";

/// Downloadable file of a dataset on the HuggingFace Hub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubFile {
    /// JSONL file on the main branch holding exactly the rows of the split
    Jsonl(&'static str),
    /// First shard of the parquet conversion, `{config}/{split}/0000.parquet`.
    /// One shard is well above the per-dataset record cap.
    Parquet { config: &'static str },
}

impl HubFile {
    /// Revision (`None` for main) and in-repo path for `split`
    pub fn location(&self, split: &str) -> (Option<&'static str>, String) {
        match self {
            HubFile::Jsonl(file) => (None, file.to_string()),
            HubFile::Parquet { config } => (
                Some(PARQUET_REVISION),
                format!("{}/{}/0000.parquet", config, split),
            ),
        }
    }
}

/// Where and how to read one QA dataset
#[derive(Clone)]
pub struct DatasetSpec {
    /// Human-readable name used in logs and `--local` overrides
    pub label: &'static str,
    /// HuggingFace dataset repository
    pub hf_path: &'static str,
    /// Split to ingest; selects the parquet shard, and names the JSONL file's rows
    pub split: &'static str,
    /// Hub file to download; `None` requires a local file
    pub file: Option<HubFile>,
    pub id_prefix: &'static str,
    /// Provenance label stored with every record
    pub source: &'static str,
    pub question_field: &'static str,
    pub answer_field: &'static str,
    pub formatter: Formatter,
}

impl std::fmt::Debug for DatasetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetSpec")
            .field("label", &self.label)
            .field("hf_path", &self.hf_path)
            .field("split", &self.split)
            .field("file", &self.file)
            .field("id_prefix", &self.id_prefix)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl DatasetSpec {
    /// Question, answer and case text for one row
    pub fn extract(&self, row: usize, record: &Record) -> Result<(String, String, String)> {
        let question = field_text(record, self.question_field).ok_or_else(|| {
            ClinicalError::Dataset(format!(
                "{} row {} has no '{}' field",
                self.label, row, self.question_field
            ))
        })?;
        let answer = field_text(record, self.answer_field).ok_or_else(|| {
            ClinicalError::Dataset(format!(
                "{} row {} has no '{}' field",
                self.label, row, self.answer_field
            ))
        })?;
        let text = (self.formatter)(&question, &answer);
        Ok((question, answer, text))
    }

    pub fn record_id(&self, row: usize) -> String {
        format!("{}_{}", self.id_prefix, row)
    }
}

fn field_text(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub const MEDQA: DatasetSpec = DatasetSpec {
    label: "MedQA",
    hf_path: "GBaker/MedQA-USMLE-4-options",
    split: "train",
    file: Some(HubFile::Jsonl("phrases_no_exclude_train.jsonl")),
    id_prefix: "medqa",
    source: "MedQA USMLE",
    question_field: "question",
    answer_field: "answer",
    formatter: format_question_answer,
};

pub const LAVITA: DatasetSpec = DatasetSpec {
    label: "Lavita",
    hf_path: "lavita/medical-qa-datasets",
    split: "train",
    file: Some(HubFile::Parquet {
        config: "all-processed",
    }),
    id_prefix: "lavita",
    source: "Lavita Medical QA",
    question_field: "input",
    answer_field: "output",
    formatter: format_question_answer,
};

/// Datasets ingested by default, in order
pub fn default_datasets() -> Vec<DatasetSpec> {
    vec![MEDQA, LAVITA]
}

/// Resolve the dataset file, downloading from the Hub unless overridden
pub fn locate(spec: &DatasetSpec, local: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = local {
        return Ok(path.to_path_buf());
    }

    let hub_file = spec.file.ok_or_else(|| {
        ClinicalError::Dataset(format!(
            "{} has no downloadable file; pass --local {}=PATH",
            spec.label, spec.label
        ))
    })?;
    let (revision, file) = hub_file.location(spec.split);

    let api = Api::new()
        .map_err(|e| ClinicalError::Dataset(format!("Failed to create HuggingFace API client: {}", e)))?;
    let repo = match revision {
        Some(rev) => Repo::with_revision(spec.hf_path.to_string(), RepoType::Dataset, rev.to_string()),
        None => Repo::new(spec.hf_path.to_string(), RepoType::Dataset),
    };
    api.repo(repo)
        .get(&file)
        .map_err(|e| ClinicalError::Dataset(format!("Failed to download {}/{}: {}", spec.hf_path, file, e)))
}

/// Read up to `max_records` JSON objects from a JSONL file
pub fn read_jsonl(path: &Path, max_records: usize) -> Result<Vec<Record>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        if records.len() >= max_records {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line)? {
            Value::Object(map) => records.push(map),
            _ => {
                return Err(ClinicalError::Dataset(format!(
                    "{}:{} is not a JSON object",
                    path.display(),
                    line_no + 1
                )))
            }
        }
    }

    Ok(records)
}

/// Read up to `max_records` rows from a parquet file as JSON objects
pub fn read_parquet(path: &Path, max_records: usize) -> Result<Vec<Record>> {
    let parquet_err = |e: parquet::errors::ParquetError| {
        ClinicalError::Dataset(format!("{}: {}", path.display(), e))
    };
    let arrow_err = |e: arrow::error::ArrowError| {
        ClinicalError::Dataset(format!("{}: {}", path.display(), e))
    };

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)
        .map_err(parquet_err)?
        .with_limit(max_records)
        .build()
        .map_err(parquet_err)?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.map_err(arrow_err)?;
        let mut writer = ArrayWriter::new(Vec::new());
        writer.write(&batch).map_err(arrow_err)?;
        writer.finish().map_err(arrow_err)?;
        let rows: Vec<Record> = serde_json::from_slice(&writer.into_inner())?;
        records.extend(rows);
        if records.len() >= max_records {
            break;
        }
    }

    records.truncate(max_records);
    Ok(records)
}

/// Parse a dataset file, choosing the reader by extension
pub fn read_records(path: &Path, max_records: usize) -> Result<Vec<Record>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("parquet") => read_parquet(path, max_records),
        _ => read_jsonl(path, max_records),
    }
}

/// Locate and parse a dataset
pub fn load_dataset(spec: &DatasetSpec, local: Option<&Path>, max_records: usize) -> Result<Vec<Record>> {
    info!(dataset = spec.label, split = spec.split, "loading dataset");
    let path = locate(spec, local)?;
    let records = read_records(&path, max_records)?;
    info!(dataset = spec.label, records = records.len(), "dataset ready");
    Ok(records)
}

/// Like `load_dataset`, but a failure skips the dataset instead of aborting
pub fn load_dataset_safe(spec: &DatasetSpec, local: Option<&Path>, max_records: usize) -> Option<Vec<Record>> {
    match load_dataset(spec, local, max_records) {
        Ok(records) => Some(records),
        Err(e) => {
            warn!(dataset = spec.label, error = %e, "failed to load dataset, skipping");
            None
        }
    }
}
