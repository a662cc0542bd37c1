use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::record::MetricsRecord;

pub trait MetricsSink {
    fn log(&mut self, record: &MetricsRecord) -> Result<()>;

    /// Flush and close. Further `log` calls fail; repeated `close` is a no-op.
    fn close(&mut self) -> Result<()>;
}

impl<M: MetricsSink + ?Sized> MetricsSink for &mut M {
    fn log(&mut self, record: &MetricsRecord) -> Result<()> {
        (**self).log(record)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// `<dir>/run_<YYYYmmdd_HHMMSS>.jsonl`, local time.
pub fn default_log_path(dir: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("run_{}.jsonl", timestamp))
}

/// Newline-delimited JSON metrics file.
pub struct JsonlMetricsLogger {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: u64,
}

impl JsonlMetricsLogger {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create metrics dir {}", parent.display()))?;
        }
        let file = File::create(&path)
            .with_context(|| format!("failed to create metrics log {}", path.display()))?;
        log::info!("writing metrics to {}", path.display());
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_written(&self) -> u64 {
        self.written
    }
}

impl MetricsSink for JsonlMetricsLogger {
    fn log(&mut self, record: &MetricsRecord) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("metrics log {} already closed", self.path.display()))?;
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .with_context(|| format!("failed to flush {}", self.path.display()))?;
            log::debug!(
                "metrics log {} closed ({} records)",
                self.path.display(),
                self.written
            );
        }
        Ok(())
    }
}

impl Drop for JsonlMetricsLogger {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("{:#}", e);
        }
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetricsSink {
    records: Vec<MetricsRecord>,
    closed: bool,
}

impl InMemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[MetricsRecord] {
        &self.records
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl MetricsSink for InMemoryMetricsSink {
    fn log(&mut self, record: &MetricsRecord) -> Result<()> {
        if self.closed {
            return Err(anyhow!("metrics sink already closed"));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
