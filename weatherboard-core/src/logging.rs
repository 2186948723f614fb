//! Process logger: `env_logger` writing to stderr and to a size-rotated file.

use chrono::Local;
use env_logger::{Env, Target};
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::config::LogConfig;

const MAX_BYTES: u64 = 1_000_000;
const BACKUPS: usize = 3;

/// Copies every write to stderr and to the log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Installs the global logger. Call once, before anything logs.
///
/// If the log file cannot be opened the logger still goes to stderr and the
/// failure is reported as the first log line.
pub fn init(config: &LogConfig) {
    let opened = rotate(&config.file, MAX_BYTES, BACKUPS).and_then(|()| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)
    });

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    let failure = match opened {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(Tee { file })));
            None
        }
        Err(e) => {
            builder.target(Target::Stderr);
            Some(e)
        }
    };

    if let Err(e) = builder.try_init() {
        eprintln!("Logger already installed, keeping it: {e}");
        return;
    }

    if let Some(e) = failure {
        log::warn!("Could not open log file {}: {e}", config.file.display());
    }
}

fn backup(path: &Path, n: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Shifts `path` to `path.1`, `path.1` to `path.2` and so on once it grows
/// past `max_bytes`, keeping at most `backups` old files.
pub fn rotate(path: &Path, max_bytes: u64, backups: usize) -> io::Result<()> {
    let len = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if len <= max_bytes || backups == 0 {
        return Ok(());
    }

    for n in (1..backups).rev() {
        let from = backup(path, n);
        if from.exists() {
            fs::rename(&from, backup(path, n + 1))?;
        }
    }
    fs::rename(path, backup(path, 1))
}
