use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, StringArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use common::AppError;
use normalizer::RepositoryRecord;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tempfile::NamedTempFile;

/// Durable destination for the accumulated records. Every call replaces the
/// previous contents of `destination` with the full slice.
pub trait RecordSink: Send + Sync {
    fn save(&self, records: &[RepositoryRecord], destination: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
    JsonLines,
}

impl OutputFormat {
    pub fn resolve(path: &Path) -> Result<(Self, PathBuf), AppError> {
        let Some(extension) = path.extension() else {
            return Ok((OutputFormat::Parquet, path.with_extension("parquet")));
        };
        match extension.to_string_lossy().to_ascii_lowercase().as_str() {
            "parquet" => Ok((OutputFormat::Parquet, path.to_path_buf())),
            "csv" => Ok((OutputFormat::Csv, path.to_path_buf())),
            "json" | "jsonl" => Ok((OutputFormat::JsonLines, path.to_path_buf())),
            other => Err(AppError::invalid(format!(
                "unsupported output extension `.{other}` (use .parquet, .csv, .json or .jsonl)"
            ))),
        }
    }

    pub fn sink(self) -> Arc<dyn RecordSink> {
        match self {
            OutputFormat::Parquet => Arc::new(ParquetSink),
            OutputFormat::Csv => Arc::new(CsvSink),
            OutputFormat::JsonLines => Arc::new(JsonLinesSink),
        }
    }
}

pub const COLUMNS: [&str; 33] = [
    "nwo",
    "name",
    "description",
    "url",
    "homepage_url",
    "created_at",
    "updated_at",
    "pushed_at",
    "stars",
    "forks",
    "watchers",
    "open_issues",
    "disk_usage_kb",
    "primary_language",
    "languages",
    "topics",
    "is_fork",
    "is_archived",
    "is_private",
    "is_template",
    "has_wiki",
    "has_issues",
    "license_key",
    "license_name",
    "owner_login",
    "owner_type",
    "owner_location",
    "owner_company",
    "owner_bio",
    "owner_email",
    "owner_followers",
    "owner_created_at",
    "readme_content",
];

pub struct ParquetSink;

impl RecordSink for ParquetSink {
    fn save(&self, records: &[RepositoryRecord], destination: &Path) -> Result<()> {
        let batch = record_batch(records)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        write_atomically(destination, |file| {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
            writer.write(&batch)?;
            writer.close()?;
            Ok(())
        })
    }
}

fn record_batch(records: &[RepositoryRecord]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        text(records.iter().map(|r| r.nwo.as_str())),
        text(records.iter().map(|r| r.name.as_str())),
        text(records.iter().map(|r| r.description.as_str())),
        text(records.iter().map(|r| r.url.as_str())),
        text(records.iter().map(|r| r.homepage_url.as_str())),
        text(records.iter().map(|r| r.created_at.as_str())),
        text(records.iter().map(|r| r.updated_at.as_str())),
        text(records.iter().map(|r| r.pushed_at.as_str())),
        counts(records.iter().map(|r| r.stars)),
        counts(records.iter().map(|r| r.forks)),
        counts(records.iter().map(|r| r.watchers)),
        counts(records.iter().map(|r| r.open_issues)),
        counts(records.iter().map(|r| r.disk_usage_kb)),
        text(records.iter().map(|r| r.primary_language.as_str())),
        json_text(records.iter().map(|r| &r.languages))?,
        json_text(records.iter().map(|r| &r.topics))?,
        flags(records.iter().map(|r| r.is_fork)),
        flags(records.iter().map(|r| r.is_archived)),
        flags(records.iter().map(|r| r.is_private)),
        flags(records.iter().map(|r| r.is_template)),
        flags(records.iter().map(|r| r.has_wiki)),
        flags(records.iter().map(|r| r.has_issues)),
        text(records.iter().map(|r| r.license_key.as_str())),
        text(records.iter().map(|r| r.license_name.as_str())),
        text(records.iter().map(|r| r.owner_login.as_str())),
        text(records.iter().map(|r| r.owner_type.as_str())),
        text(records.iter().map(|r| r.owner_location.as_str())),
        text(records.iter().map(|r| r.owner_company.as_str())),
        text(records.iter().map(|r| r.owner_bio.as_str())),
        text(records.iter().map(|r| r.owner_email.as_str())),
        counts(records.iter().map(|r| r.owner_followers)),
        text(records.iter().map(|r| r.owner_created_at.as_str())),
        text(records.iter().map(|r| r.readme_content.as_str())),
    ];
    let batch = RecordBatch::try_from_iter(COLUMNS.into_iter().zip(columns))?;
    Ok(batch)
}

fn text<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn counts(values: impl Iterator<Item = u64>) -> ArrayRef {
    Arc::new(UInt64Array::from_iter_values(values))
}

fn flags(values: impl Iterator<Item = bool>) -> ArrayRef {
    Arc::new(BooleanArray::from(values.collect::<Vec<bool>>()))
}

fn json_text<'a>(values: impl Iterator<Item = &'a Vec<String>>) -> Result<ArrayRef> {
    let encoded = values
        .map(serde_json::to_string)
        .collect::<Result<Vec<String>, _>>()?;
    Ok(Arc::new(StringArray::from(encoded)))
}

pub struct CsvSink;

impl RecordSink for CsvSink {
    fn save(&self, records: &[RepositoryRecord], destination: &Path) -> Result<()> {
        write_atomically(destination, |file| {
            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(COLUMNS)?;
            for record in records {
                writer.write_record(csv_row(record)?)?;
            }
            writer.flush()?;
            Ok(())
        })
    }
}

fn csv_row(record: &RepositoryRecord) -> Result<[String; 33]> {
    Ok([
        record.nwo.clone(),
        record.name.clone(),
        record.description.clone(),
        record.url.clone(),
        record.homepage_url.clone(),
        record.created_at.clone(),
        record.updated_at.clone(),
        record.pushed_at.clone(),
        record.stars.to_string(),
        record.forks.to_string(),
        record.watchers.to_string(),
        record.open_issues.to_string(),
        record.disk_usage_kb.to_string(),
        record.primary_language.clone(),
        serde_json::to_string(&record.languages)?,
        serde_json::to_string(&record.topics)?,
        record.is_fork.to_string(),
        record.is_archived.to_string(),
        record.is_private.to_string(),
        record.is_template.to_string(),
        record.has_wiki.to_string(),
        record.has_issues.to_string(),
        record.license_key.clone(),
        record.license_name.clone(),
        record.owner_login.clone(),
        record.owner_type.as_str().to_string(),
        record.owner_location.clone(),
        record.owner_company.clone(),
        record.owner_bio.clone(),
        record.owner_email.clone(),
        record.owner_followers.to_string(),
        record.owner_created_at.clone(),
        record.readme_content.clone(),
    ])
}

pub struct JsonLinesSink;

impl RecordSink for JsonLinesSink {
    fn save(&self, records: &[RepositoryRecord], destination: &Path) -> Result<()> {
        write_atomically(destination, |file| {
            let mut writer = BufWriter::new(file);
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            Ok(())
        })
    }
}

fn write_atomically<F>(destination: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut fs::File) -> Result<()>,
{
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .with_context(|| format!("creating output directory {}", parent.display()))?;

    let mut staged = NamedTempFile::new_in(&parent)
        .with_context(|| format!("staging output in {}", parent.display()))?;
    write(staged.as_file_mut())
        .with_context(|| format!("writing {}", destination.display()))?;
    staged
        .persist(destination)
        .with_context(|| format!("replacing {}", destination.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        let (format, path) = OutputFormat::resolve(Path::new("out/peru")).unwrap();
        assert_eq!(format, OutputFormat::Parquet);
        assert_eq!(path, PathBuf::from("out/peru.parquet"));

        let (format, _) = OutputFormat::resolve(Path::new("peru.csv")).unwrap();
        assert_eq!(format, OutputFormat::Csv);

        let (format, _) = OutputFormat::resolve(Path::new("peru.JSONL")).unwrap();
        assert_eq!(format, OutputFormat::JsonLines);

        assert!(matches!(
            OutputFormat::resolve(Path::new("peru.xlsx")),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn csv_row_matches_header_width() {
        let row = csv_row(&RepositoryRecord {
            languages: vec!["Rust".into(), "C".into()],
            ..RepositoryRecord::default()
        })
        .unwrap();
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(row[14], r#"["Rust","C"]"#);
        assert_eq!(row[15], "[]");
    }

    #[test]
    fn record_batch_follows_column_order() {
        let records = vec![RepositoryRecord::default(); 2];
        let batch = record_batch(&records).unwrap();
        assert_eq!(batch.num_rows(), 2);
        let names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        assert_eq!(names, COLUMNS);
    }
}
