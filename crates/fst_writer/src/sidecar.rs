//! The `<trace>.hier` file collecting declarations during a run.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use fst_common::HierRecord;

/// Returns the sidecar path for a trace file.
pub fn sidecar_path(trace: &Path) -> PathBuf {
    let mut name = trace.as_os_str().to_owned();
    name.push(".hier");
    PathBuf::from(name)
}

/// Append-only hierarchy record sink.
pub struct HierSidecar {
    path: PathBuf,
    out: BufWriter<File>,
    len: u64,
    scratch: Vec<u8>,
}

impl HierSidecar {
    /// Creates (or truncates) the sidecar next to `trace`.
    pub fn create(trace: &Path) -> io::Result<Self> {
        let path = sidecar_path(trace);
        let out = BufWriter::new(File::create(&path)?);
        Ok(Self {
            path,
            out,
            len: 0,
            scratch: Vec::with_capacity(64),
        })
    }

    /// Appends one record.
    pub fn append(&mut self, record: &HierRecord) -> io::Result<()> {
        self.scratch.clear();
        record.encode(&mut self.scratch);
        self.out.write_all(&self.scratch)?;
        self.len += self.scratch.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Flushes buffered records and returns the sidecar's path.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        self.out.flush()?;
        Ok(self.path)
    }

    /// Flushes and reads back every record byte.
    pub fn take_contents(self) -> io::Result<(Vec<u8>, PathBuf)> {
        let path = self.finish()?;
        let mut data = Vec::new();
        File::open(&path)?.read_to_end(&mut data)?;
        Ok((data, path))
    }
}

/// Removes a folded sidecar.
pub fn remove_sidecar(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}
