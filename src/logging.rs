//! # Logging
//!
//! Installs an [env_logger] backend for the [log] facade. Records go to stderr and, when a
//! directory is configured, to a timestamped file in that directory. `RUST_LOG` takes precedence
//! over the configured level.

use std::fs;
use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use env_logger::Builder;
use env_logger::Env;
use env_logger::Target;
use log::LevelFilter;

use crate::Error;

/// # Log Settings
#[derive(Clone, Debug, PartialEq)]
pub struct LogSettings {
    /// Level used when `RUST_LOG` is not set.
    pub level: LevelFilter,
    /// Directory receiving the log file. No file is written when this is `None`.
    pub directory: Option<PathBuf>,
    /// Log file name prefix.
    pub file_prefix: String,
}

impl LogSettings {
    /// Sets the default level.
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Sets the log file directory.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Disables the log file.
    pub fn without_file(mut self) -> Self {
        self.directory = None;
        self
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::Trace,
            directory: Some(PathBuf::from("Logs")),
            file_prefix: "Startup".to_string(),
        }
    }
}

/// Parses a level name. `critical` is accepted as an alias of `error`.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    if name.eq_ignore_ascii_case("critical") {
        return Some(LevelFilter::Error);
    }

    LevelFilter::from_str(name).ok()
}

/// Returns the log file path for the settings at the current local time.
pub fn log_file_path(settings: &LogSettings) -> Option<PathBuf> {
    let directory = settings.directory.as_ref()?;
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    Some(directory.join(format!("{}-{timestamp}.log", settings.file_prefix)))
}

/// Installs the global logger and returns the path of the log file, if any.
pub fn init(settings: &LogSettings) -> Result<Option<PathBuf>, Error> {
    let path = log_file_path(settings);
    let target = match &path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            Target::Pipe(Box::new(TeeWriter {
                file: File::create(path)?,
            }))
        }
        None => Target::Stderr,
    };

    Builder::from_env(Env::default().default_filter_or(settings.level.to_string()))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}: {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(target)
        .try_init()?;

    if let Some(path) = &path {
        log::info!("Logging to {}", path.display());
    }

    Ok(path)
}

/// Returns the lines of a log file.
pub fn read_log(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::to_string)
        .collect())
}

/// Truncates a log file.
pub fn clear_log(path: impl AsRef<Path>) -> io::Result<()> {
    File::create(path).map(|_| ())
}

struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_critical_returns_error() {
        assert_eq!(parse_level("critical"), Some(LevelFilter::Error));
        assert_eq!(parse_level("CRITICAL"), Some(LevelFilter::Error));
    }

    #[test]
    fn parse_level_known_name_returns_level() {
        assert_eq!(parse_level("warn"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn log_file_path_without_directory_returns_none() {
        let settings = LogSettings::default().without_file();

        assert_eq!(log_file_path(&settings), None);
    }

    #[test]
    fn log_file_path_uses_prefix_and_directory() {
        let settings = LogSettings::default().with_directory("out");

        let path = log_file_path(&settings).unwrap();

        assert!(path.starts_with("out"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Startup-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn tee_writer_writes_to_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("tee.log");
        let mut writer = TeeWriter {
            file: File::create(&path).unwrap(),
        };

        writer.write_all(b"first\nsecond\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(read_log(&path).unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn clear_log_empties_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("old.log");
        fs::write(&path, "line\n").unwrap();

        clear_log(&path).unwrap();

        assert!(read_log(&path).unwrap().is_empty());
    }
}
