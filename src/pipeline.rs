//! Threaded reader -> splitter -> worker pool -> aggregator pipeline.
//!
//! Stages talk only through bounded channels, so a slow consumer blocks its
//! producer and peak memory stays near `capacity * block_size` per queue.
//! Dropping a sender closes the queue and lets the next stage finish.

use std::fs::File;
use std::io::{self, Read};
use std::panic;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, trace};

use crate::aggregate::{self, Report};
use crate::error::{ConfigError, ParseError, PipelineError};
use crate::reader::{ChunkReader, BLOCK_SIZE};
use crate::splitter::LineSplitter;
use crate::worker::{StationTable, UnitParser};

/// Default capacity of each inter-stage queue.
pub const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bytes requested per read.
    pub block_size: usize,
    /// Number of parsing threads.
    pub workers: usize,
    /// Raw blocks buffered between the reader and the splitter.
    pub block_queue_capacity: usize,
    /// Aligned units buffered between the splitter and the workers.
    pub unit_queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            workers: thread::available_parallelism().map_or(4, usize::from),
            block_queue_capacity: QUEUE_CAPACITY,
            unit_queue_capacity: QUEUE_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.block_queue_capacity == 0 || self.unit_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub blocks: u64,
    pub bytes: u64,
    /// Aligned units handed to workers.
    pub units: u64,
    pub records: u64,
    pub workers: usize,
}

#[derive(Debug)]
pub struct Summary {
    pub report: Report,
    pub stats: PipelineStats,
}

pub fn run_file(path: &Path, config: &PipelineConfig) -> Result<Summary, PipelineError> {
    config.validate()?;
    let file = File::open(path).map_err(|source| PipelineError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("opened {}", path.display());
    run(file, config)
}

/// Reads `source` once and aggregates every record in it.
///
/// Output is all-or-nothing: a read error or a malformed record fails the
/// whole run. When both happen the read error is reported.
pub fn run<R: Read + Send>(source: R, config: &PipelineConfig) -> Result<Summary, PipelineError> {
    config.validate()?;

    let (block_tx, block_rx) = bounded::<Vec<u8>>(config.block_queue_capacity);
    let (unit_tx, unit_rx) = bounded::<Vec<u8>>(config.unit_queue_capacity);
    let abort = AtomicBool::new(false);
    let block_size = config.block_size;

    let (read, units, worked) = thread::scope(|s| {
        let abort = &abort;
        let reader = spawn(s, "reader".to_owned(), abort, move || {
            read_blocks(source, block_size, block_tx, abort)
        });
        let splitter = spawn(s, "splitter".to_owned(), abort, move || {
            split_blocks(block_rx, unit_tx, abort)
        });
        let workers = (0..config.workers)
            .map(|id| {
                let units = unit_rx.clone();
                spawn(s, format!("worker-{id}"), abort, move || {
                    parse_units(id, units, abort)
                })
            })
            .collect::<Vec<_>>();
        drop(unit_rx);

        let worked = workers
            .into_iter()
            .map(|w| w.map(join))
            .collect::<io::Result<Vec<_>>>();
        (reader.map(join), splitter.map(join), worked)
    });

    let (blocks, bytes) = read
        .map_err(PipelineError::Spawn)?
        .map_err(PipelineError::Read)?;
    let units = units.map_err(PipelineError::Spawn)?;

    let mut tables = Vec::with_capacity(config.workers);
    let mut records = 0;
    for result in worked.map_err(PipelineError::Spawn)? {
        let (table, parsed) = result?;
        records += parsed;
        tables.push(table);
    }

    let merged = aggregate::merge_parallel(tables)?;
    debug!("merged {} stations from {} workers", merged.len(), config.workers);
    let report = Report::from_table(&merged);

    Ok(Summary {
        report,
        stats: PipelineStats {
            blocks,
            bytes,
            units,
            records,
            workers: config.workers,
        },
    })
}

fn spawn<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    name: String,
    abort: &AtomicBool,
    f: F,
) -> io::Result<ScopedJoinHandle<'scope, T>>
where
    T: Send + 'scope,
    F: FnOnce() -> T + Send + 'scope,
{
    thread::Builder::new()
        .name(name)
        .spawn_scoped(scope, f)
        .map_err(|e| {
            error!("failed to spawn pipeline thread: {e}");
            abort.store(true, Ordering::Relaxed);
            e
        })
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle.join().unwrap_or_else(|p| panic::resume_unwind(p))
}

fn read_blocks<R: Read>(
    source: R,
    block_size: usize,
    blocks: Sender<Vec<u8>>,
    abort: &AtomicBool,
) -> io::Result<(u64, u64)> {
    let mut count = 0;
    let mut bytes = 0;
    let mut reader = ChunkReader::new(source, block_size);
    loop {
        if abort.load(Ordering::Relaxed) {
            debug!("reader: aborted after {count} blocks");
            break;
        }
        let Some(block) = reader.next() else {
            break;
        };
        let block = block.map_err(|e| {
            error!("reader: read failed after {bytes} bytes: {e}");
            abort.store(true, Ordering::Relaxed);
            e
        })?;
        count += 1;
        bytes += block.len() as u64;
        trace!("reader: block {count} ({} bytes)", block.len());
        if blocks.send(block).is_err() {
            debug!("reader: splitter hung up");
            break;
        }
    }
    debug!("reader: done, {count} blocks, {bytes} bytes");
    Ok((count, bytes))
}

fn split_blocks(blocks: Receiver<Vec<u8>>, units: Sender<Vec<u8>>, abort: &AtomicBool) -> u64 {
    let mut splitter = LineSplitter::new();
    let mut count = 0;
    for block in blocks.iter() {
        if let Some(unit) = splitter.push(block) {
            trace!("splitter: unit {count} ({} bytes)", unit.len());
            if units.send(unit).is_err() {
                debug!("splitter: workers hung up");
                return count;
            }
            count += 1;
        }
    }
    if abort.load(Ordering::Relaxed) {
        return count;
    }
    if let Some(tail) = splitter.finish() {
        trace!("splitter: flushing {} unterminated bytes", tail.len());
        if units.send(tail).is_ok() {
            count += 1;
        }
    }
    debug!("splitter: done, {count} units");
    count
}

fn parse_units(
    id: usize,
    units: Receiver<Vec<u8>>,
    abort: &AtomicBool,
) -> Result<(StationTable, u64), ParseError> {
    let mut parser = UnitParser::new();
    for unit in units.iter() {
        if abort.load(Ordering::Relaxed) {
            debug!("worker-{id}: aborted");
            break;
        }
        parser.parse(&unit).map_err(|e| {
            error!("worker-{id}: {e}");
            abort.store(true, Ordering::Relaxed);
            e
        })?;
    }
    let records = parser.records();
    let table = parser.finish();
    debug!("worker-{id}: done, {records} records, {} stations", table.len());
    Ok((table, records))
}
