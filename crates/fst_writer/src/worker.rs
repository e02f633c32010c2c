//! Background block flushing.
//!
//! The writer hands a sealed [`BlockJob`] plus ownership of the output file
//! to one worker thread over a bounded channel, then keeps recording into a
//! fresh arena. The file comes back with the result, so at most one flush
//! can be in flight and the caller cannot touch the file meanwhile.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, error};

use crate::block::BlockJob;
use crate::error::WriterError;

/// Work handed to the flush thread.
pub struct FlushJob {
    pub block: BlockJob,
    pub out: BufWriter<File>,
}

/// The file handed back by the flush thread, with the bytes it appended.
pub struct FlushDone {
    pub out: BufWriter<File>,
    pub result: Result<u64, WriterError>,
}

enum FlushCommand {
    Flush(Box<FlushJob>),
    Shutdown,
}

/// Encodes a block and appends it to `out`, returning the bytes written.
pub fn write_block(block: &BlockJob, out: &mut BufWriter<File>) -> Result<u64, WriterError> {
    let bytes = block.encode()?;
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(bytes.len() as u64)
}

/// Handle to the single flush thread.
pub struct FlushWorker {
    command_tx: Sender<FlushCommand>,
    done_rx: Receiver<FlushDone>,
    thread: Option<JoinHandle<()>>,
}

impl FlushWorker {
    /// Starts the flush thread.
    pub fn spawn() -> Result<Self, WriterError> {
        let (command_tx, command_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);
        let thread = thread::Builder::new()
            .name("fst-flush".to_string())
            .spawn(move || Self::worker_loop(command_rx, done_tx))?;
        Ok(Self {
            command_tx,
            done_rx,
            thread: Some(thread),
        })
    }

    fn worker_loop(command_rx: Receiver<FlushCommand>, done_tx: Sender<FlushDone>) {
        while let Ok(cmd) = command_rx.recv() {
            match cmd {
                FlushCommand::Flush(job) => {
                    let FlushJob { block, mut out } = *job;
                    let result = write_block(&block, &mut out);
                    if let Err(err) = &result {
                        error!(error = %err, "background block flush failed");
                    }
                    if done_tx.send(FlushDone { out, result }).is_err() {
                        break;
                    }
                }
                FlushCommand::Shutdown => break,
            }
        }
        debug!("flush worker exiting");
    }

    /// Hands a job to the thread. The caller must [`wait`](Self::wait)
    /// before submitting another.
    pub fn submit(&self, job: FlushJob) -> Result<(), WriterError> {
        self.command_tx
            .send(FlushCommand::Flush(Box::new(job)))
            .map_err(|_| WriterError::WorkerGone)
    }

    /// Blocks until the outstanding job finishes.
    pub fn wait(&self) -> Result<FlushDone, WriterError> {
        self.done_rx.recv().map_err(|_| WriterError::WorkerGone)
    }
}

impl Drop for FlushWorker {
    fn drop(&mut self) {
        let _ = self.command_tx.send(FlushCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
