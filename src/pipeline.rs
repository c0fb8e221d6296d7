//! Driving a run: chunk, fetch, resolve, write, reconcile, repeat.

use std::fmt;
use std::io::Write;

use crate::annotate::extract;
use crate::chunk::{chunk_ids, Chunk};
use crate::config::HarvestConfig;
use crate::errors::{HarvestError, RecordParseError};
use crate::fetch::{BatchSource, Fetcher, Sleeper};
use crate::resolve::{resolve, Resolution};
use crate::writer::{ChunkBookkeeping, OutputWriter};

/// Where the driver is. Transitions are traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Chunking,
    Fetching,
    /// Cooling down before fetching the same chunk again
    Throttled,
    /// Given up on a chunk, on to the next one
    Abandoned,
    Processing,
    LoggingChunk,
    Finalizing,
    Done,
}

/// Counts for one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub chunks: usize,
    pub abandoned_chunks: usize,
    pub abandoned_ids: usize,
    pub throttled: usize,
    pub records: usize,
    pub resolved: usize,
    pub no_sequence: usize,
    pub parse_failures: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} records in {} chunks: {} resolved, {} without sequence, {} failed extraction; \
             {} chunks ({} IDs) abandoned after {} throttled requests",
            self.records,
            self.chunks,
            self.resolved,
            self.no_sequence,
            self.parse_failures,
            self.abandoned_chunks,
            self.abandoned_ids,
            self.throttled
        )
    }
}

#[derive(Debug)]
pub struct Pipeline<S: BatchSource, Z: Sleeper, W: Write> {
    fetcher: Fetcher<S>,
    sleeper: Z,
    writer: OutputWriter<W>,
    config: HarvestConfig,
    stage: Stage,
}

impl<S: BatchSource, Z: Sleeper, W: Write> Pipeline<S, Z, W> {
    pub fn new(
        source: S,
        sleeper: Z,
        writer: OutputWriter<W>,
        config: HarvestConfig,
    ) -> Result<Self, HarvestError> {
        config.validate()?;
        Ok(Pipeline {
            fetcher: Fetcher::new(source, config.retry),
            sleeper,
            writer,
            config,
            stage: Stage::Idle,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        debug!("{:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Processes `ids` chunk by chunk. Only a failure to write the output
    /// ends the run early; chunks that can't be fetched are skipped.
    pub fn run<I>(&mut self, ids: I) -> Result<RunSummary, HarvestError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut summary = RunSummary::default();
        self.enter(Stage::Chunking);
        self.writer
            .write_header(&self.config.headers)
            .map_err(HarvestError::Output)?;
        let mut chunks = chunk_ids(ids, self.config.chunk_size).peekable();
        while let Some(chunk) = chunks.next() {
            self.process_chunk(&chunk, &mut summary)?;
            summary.chunks += 1;
            info!("Processed {} records...", summary.records);
            let pacing = self.config.pacing;
            if pacing.every > 0 && summary.chunks % pacing.every == 0 && chunks.peek().is_some() {
                info!(
                    "{} chunks done, pausing for {}s",
                    summary.chunks,
                    pacing.pause.as_secs_f32()
                );
                self.sleeper.sleep(pacing.pause);
            }
            self.enter(Stage::Chunking);
        }
        self.enter(Stage::Finalizing);
        self.writer.flush().map_err(HarvestError::Output)?;
        self.enter(Stage::Done);
        info!("Done: {}", summary);
        Ok(summary)
    }

    fn process_chunk(&mut self, chunk: &Chunk, summary: &mut RunSummary) -> Result<(), HarvestError> {
        self.enter(Stage::Fetching);
        let mut throttled = 0;
        let stage = &mut self.stage;
        let fetched = self.fetcher.fetch(chunk, &mut self.sleeper, |attempt, delay| {
            debug!("{:?} -> {:?} (attempt {}, {:?})", stage, Stage::Throttled, attempt, delay);
            *stage = Stage::Throttled;
            throttled += 1;
        });
        summary.throttled += throttled;
        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                self.enter(Stage::Abandoned);
                warn!("Abandoning chunk {} ({} IDs): {}", chunk.span(), chunk.len(), e);
                summary.abandoned_chunks += 1;
                summary.abandoned_ids += chunk.len();
                if self.config.log_fetch_failures {
                    self.writer
                        .write_fetch_failures(chunk.ids())
                        .and_then(|_| self.writer.flush())
                        .map_err(HarvestError::Output)?;
                }
                return Ok(());
            }
        };

        self.enter(Stage::Processing);
        let mut book = ChunkBookkeeping::default();
        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(RecordParseError::Malformed { id, reason }) => {
                    warn!(
                        "Skipping malformed record {:?} in chunk {}: {}",
                        id,
                        chunk.span(),
                        reason
                    );
                    if !id.is_empty() {
                        summary.records += 1;
                        book.observe(&id);
                        book.mark_parse_failed(&id);
                    }
                    continue;
                }
                Err(e) => {
                    warn!("Stopped reading chunk {}: {}", chunk.span(), e);
                    break;
                }
            };
            summary.records += 1;
            book.observe(&record.id);
            match resolve(&record, &self.config.recognition, &self.config.feature_types) {
                Resolution::Resolved { gene, sequence } => {
                    if book.mark_resolved(&record.id) {
                        let cells = extract(&record, &sequence, &self.config.headers);
                        self.writer
                            .write_resolved(&record.id, &gene, &sequence, &cells)
                            .map_err(HarvestError::Output)?;
                    }
                }
                Resolution::NoGeneFound => {}
                Resolution::ParseFailure(_) => {
                    book.mark_parse_failed(&record.id);
                }
            }
        }

        self.enter(Stage::LoggingChunk);
        self.writer
            .write_chunk_log(&book)
            .and_then(|_| self.writer.flush())
            .map_err(HarvestError::Output)?;
        summary.resolved += book.resolved_count();
        summary.parse_failures += book.parse_failed().len();
        summary.no_sequence += book.no_sequence().len();
        Ok(())
    }

    pub fn into_writer(self) -> OutputWriter<W> {
        self.writer
    }
}
