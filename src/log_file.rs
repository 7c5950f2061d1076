// Copyright 2023 - 2026 The Gauntlet Authors

//! Per-runner log files.
//!
//! Each scheduler worker owns one log file, segregated by runner id, so
//! concurrent host runs never interleave their commentary.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};

use crate::Result;

/// Text inserted in log files to make important sections more visible.
pub const LOG_MARKER: &str = "***";

/// A log file for one runner or scenario.
#[derive(Debug)]
pub struct LogFile {
    path: Utf8PathBuf,
    write_to: File,
}

impl LogFile {
    pub fn create_in(log_dir: &Utf8Path, basename: &str) -> Result<LogFile> {
        let basename = clean_filename(basename);
        for i in 0..1000 {
            let name = if i == 0 {
                format!("{basename}.log")
            } else {
                format!("{basename}_{i:03}.log")
            };
            let path = log_dir.join(name);
            match OpenOptions::new()
                .write(true)
                .read(true)
                .create_new(true)
                .open(&path)
            {
                Ok(write_to) => return Ok(LogFile { path, write_to }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(anyhow::Error::from(e).context("create log file")),
            }
        }
        unreachable!("couldn't create any log file in {log_dir:?} for {basename:?}");
    }

    /// The full content of the log.
    pub fn log_content(&self) -> Result<String> {
        let mut buf = String::new();
        File::open(&self.path)
            .and_then(|mut f| f.read_to_string(&mut buf))
            .with_context(|| format!("read log file {}", self.path))?;
        Ok(buf)
    }

    /// Write a marked message. Ignores errors: logging must never take the
    /// session down.
    pub fn message(&mut self, message: &str) {
        let _ = writeln!(self.write_to, "{LOG_MARKER} {message}");
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Make a string safe to use as a file name.
pub fn clean_filename(s: &str) -> String {
    s.replace('/', "__")
        .chars()
        .map(|c| match c {
            '\\' | ' ' | ':' | '<' | '>' | '?' | '*' | '|' | '"' => '_',
            c => c,
        })
        .collect()
}
