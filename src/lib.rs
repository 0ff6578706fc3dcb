pub mod agent_core;
pub mod config;
pub mod enablement;
pub mod inference;
pub mod registry;
pub mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::StorageConfig;
use storage::{KvStore, SqliteKvStore, StorageError};

/// Return the platform-standard data directory for toolrelay.
///
/// - macOS: `~/Library/Application Support/toolrelay/`
/// - Windows: `{FOLDERID_RoamingAppData}\toolrelay\`
/// - Linux: `$XDG_DATA_HOME/toolrelay/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.toolrelay/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("toolrelay");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".toolrelay")
}

/// Open the persistent key-value store named by the `storage` config
/// section, defaulting to `{data_dir}/toolrelay.db`.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn KvStore>, StorageError> {
    let path = match &config.path {
        Some(p) => PathBuf::from(config::expand_tilde(p)),
        None => data_dir().join("toolrelay.db"),
    };
    tracing::info!(path = %path.display(), "opening kv store");
    Ok(Arc::new(SqliteKvStore::open(&path)?))
}

/// Number of previous log files kept next to `toolrelay.log`.
const KEPT_LOGS: u32 = 3;

/// Install the tracing subscriber, writing to `{data_dir}/toolrelay.log`.
///
/// The previous logs are shifted to `toolrelay.log.1`..`.3` first. Filter
/// comes from `RUST_LOG`, else `toolrelay=info,warn`. Returns the log path.
pub fn init_tracing() -> std::io::Result<PathBuf> {
    use tracing_subscriber::EnvFilter;

    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;

    let log_path = dir.join("toolrelay.log");
    rotate_logs(&log_path, KEPT_LOGS);
    let file = std::fs::File::create(&log_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("toolrelay=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_sink(file))
        .with_ansi(false)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "toolrelay started"
    );
    Ok(log_path)
}

/// `toolrelay.log` → `toolrelay.log.{n}`.
fn rotated_path(base: &Path, n: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Shift each log one slot older, dropping whatever was in slot `keep`.
/// Gaps in the chain are fine; failed renames are ignored.
fn rotate_logs(base: &Path, keep: u32) {
    let _ = std::fs::remove_file(rotated_path(base, keep));
    for n in (1..keep).rev() {
        let _ = std::fs::rename(rotated_path(base, n), rotated_path(base, n + 1));
    }
    let _ = std::fs::rename(base, rotated_path(base, 1));
}

/// Each formatted event ends in a newline, so the `LineWriter` puts every
/// event on disk as soon as it is written. `Mutex<W>` is a `MakeWriter`.
fn log_sink(file: std::fs::File) -> std::sync::Mutex<std::io::LineWriter<std::fs::File>> {
    std::sync::Mutex::new(std::io::LineWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_logs_shifts_and_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("toolrelay.log");
        std::fs::write(&base, "current").unwrap();
        std::fs::write(rotated_path(&base, 1), "one").unwrap();
        std::fs::write(rotated_path(&base, 3), "three").unwrap();

        rotate_logs(&base, 3);

        assert!(!base.exists());
        let read = |n| std::fs::read_to_string(rotated_path(&base, n)).unwrap();
        assert_eq!(read(1), "current");
        assert_eq!(read(2), "one");
        assert!(!rotated_path(&base, 3).exists());
    }

    #[test]
    fn test_rotated_path_appends_index() {
        let base = Path::new("/tmp/logs/toolrelay.log");
        assert_eq!(rotated_path(base, 2), PathBuf::from("/tmp/logs/toolrelay.log.2"));
    }

    #[test]
    fn test_log_sink_writes_each_line_through() {
        use std::io::Write;
        use tracing_subscriber::fmt::MakeWriter;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let sink = log_sink(std::fs::File::create(&path).unwrap());

        sink.make_writer().write_all(b"first event\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first event\n");
    }

    #[test]
    fn test_open_store_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        let store = open_store(&StorageConfig {
            path: Some(path.to_string_lossy().into_owned()),
        })
        .unwrap();
        store.set("pref:x", "1").unwrap();
        assert!(path.exists());
    }
}
