//! The three output artifacts: a FASTA file of extracted genes, a table of
//! annotations and a log of identifiers that could not be resolved.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::HeaderList;

const TABLE_FILE: &str = "Result_tsv.tsv";
const LOG_FILE: &str = "log_tsv.tsv";

/// Where the artifacts of one run go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub sequences: PathBuf,
    pub table: PathBuf,
    pub log: PathBuf,
}

impl OutputPaths {
    /// The sequence file is named after the input file, up to the first
    /// `.` of its name: `ids.v2.txt` gives `Result_ids.fasta`
    pub fn derive<P: AsRef<Path>, Q: AsRef<Path>>(input: P, out_dir: Q) -> OutputPaths {
        let out_dir = out_dir.as_ref();
        let name = input
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = name.split('.').next().unwrap_or_default();
        OutputPaths {
            sequences: out_dir.join(format!("Result_{}.fasta", stem)),
            table: out_dir.join(TABLE_FILE),
            log: out_dir.join(LOG_FILE),
        }
    }
}

/// How table rows are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableLayout {
    /// Every row, the header row included, is the tab separated list of
    /// its fields with an `id` column first
    #[default]
    Aligned,
    /// Byte compatible with tables written by earlier harvest tools:
    /// every header and cell is followed by a tab and the id is glued to
    /// the first cell
    Legacy,
}

/// Why an identifier shows up in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogReason {
    /// A matching feature was found but its location could not be extracted
    NoData,
    /// The record was returned but carries no matching feature
    NoSequence,
    /// The chunk was abandoned before any record was seen
    FetchFailed,
}

impl LogReason {
    pub fn as_str(self) -> &'static str {
        match self {
            LogReason::NoData => "No Data found!",
            LogReason::NoSequence => "No Sequence found",
            LogReason::FetchFailed => "Fetch failed",
        }
    }
}

/// Identifiers seen while processing one chunk. Lists keep first-seen
/// order and hold each identifier once. `resolved` and `parse_failed` are
/// disjoint, the first outcome recorded for an identifier sticks.
#[derive(Debug, Default)]
pub struct ChunkBookkeeping {
    complete: Vec<String>,
    seen: HashSet<String>,
    resolved: HashSet<String>,
    parse_failed: Vec<String>,
    failed: HashSet<String>,
}

impl ChunkBookkeeping {
    /// Every record returned for the chunk is observed first
    pub fn observe(&mut self, id: &str) {
        if self.seen.insert(id.to_owned()) {
            self.complete.push(id.to_owned());
        }
    }

    /// Returns `false` if `id` already has an outcome
    pub fn mark_resolved(&mut self, id: &str) -> bool {
        if self.failed.contains(id) {
            return false;
        }
        self.resolved.insert(id.to_owned())
    }

    /// Returns `false` if `id` already has an outcome
    pub fn mark_parse_failed(&mut self, id: &str) -> bool {
        if self.resolved.contains(id) || !self.failed.insert(id.to_owned()) {
            return false;
        }
        self.parse_failed.push(id.to_owned());
        true
    }

    pub fn complete(&self) -> &[String] {
        &self.complete
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    pub fn parse_failed(&self) -> &[String] {
        &self.parse_failed
    }

    /// Observed but neither resolved nor failed, in observation order
    pub fn no_sequence(&self) -> Vec<&str> {
        self.complete
            .iter()
            .filter(|id| !self.resolved.contains(*id) && !self.failed.contains(*id))
            .map(String::as_str)
            .collect()
    }

    /// Every observed identifier with its final outcome, `None` meaning
    /// resolved
    pub fn partitions(&self) -> Vec<(&str, Option<LogReason>)> {
        self.complete
            .iter()
            .map(|id| {
                let reason = if self.resolved.contains(id) {
                    None
                } else if self.failed.contains(id) {
                    Some(LogReason::NoData)
                } else {
                    Some(LogReason::NoSequence)
                };
                (id.as_str(), reason)
            })
            .collect()
    }
}

/// Owns the three sinks for the duration of a run
#[derive(Debug)]
pub struct OutputWriter<W: Write> {
    sequences: W,
    table: W,
    log: W,
    layout: TableLayout,
}

impl OutputWriter<BufWriter<File>> {
    /// Creates (truncating) the three files, and `out_dir` if needed
    pub fn create(paths: &OutputPaths, layout: TableLayout) -> io::Result<Self> {
        for path in [&paths.sequences, &paths.table, &paths.log] {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(OutputWriter::new(
            BufWriter::new(File::create(&paths.sequences)?),
            BufWriter::new(File::create(&paths.table)?),
            BufWriter::new(File::create(&paths.log)?),
            layout,
        ))
    }
}

impl<W: Write> OutputWriter<W> {
    pub fn new(sequences: W, table: W, log: W, layout: TableLayout) -> Self {
        OutputWriter {
            sequences,
            table,
            log,
            layout,
        }
    }

    pub fn write_header(&mut self, headers: &HeaderList) -> io::Result<()> {
        match self.layout {
            TableLayout::Aligned => {
                self.table.write_all(b"id")?;
                for h in headers.iter() {
                    write!(self.table, "\t{}", h)?;
                }
            }
            TableLayout::Legacy => {
                for h in headers.iter() {
                    write!(self.table, "{}\t", h)?;
                }
            }
        }
        self.table.write_all(b"\n")
    }

    /// Writes the FASTA entry and the table row of one resolved record
    pub fn write_resolved(
        &mut self,
        id: &str,
        gene: &str,
        sequence: &str,
        cells: &[String],
    ) -> io::Result<()> {
        write!(self.sequences, "> {}|{}\n{}\n", id, gene, sequence)?;
        self.table.write_all(id.as_bytes())?;
        for cell in cells {
            match self.layout {
                TableLayout::Aligned => write!(self.table, "\t{}", cell)?,
                TableLayout::Legacy => write!(self.table, "{}\t", cell)?,
            }
        }
        self.table.write_all(b"\n")
    }

    pub fn write_log(&mut self, id: &str, reason: LogReason) -> io::Result<()> {
        writeln!(self.log, "{}\t{}", id, reason.as_str())
    }

    /// Logs the unresolved identifiers of a finished chunk: extraction
    /// failures first, then records without a matching feature
    pub fn write_chunk_log(&mut self, book: &ChunkBookkeeping) -> io::Result<()> {
        for id in book.parse_failed() {
            self.write_log(id, LogReason::NoData)?;
        }
        for id in book.no_sequence() {
            self.write_log(id, LogReason::NoSequence)?;
        }
        Ok(())
    }

    pub fn write_fetch_failures(&mut self, ids: &[String]) -> io::Result<()> {
        for id in ids {
            self.write_log(id, LogReason::FetchFailed)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sequences.flush()?;
        self.table.flush()?;
        self.log.flush()
    }

    /// Gives back the sequence, table and log sinks
    pub fn into_inner(self) -> (W, W, W) {
        (self.sequences, self.table, self.log)
    }
}
