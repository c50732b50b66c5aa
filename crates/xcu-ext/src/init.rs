use rusqlite::Connection;
use xcu_core::XcuConfig;

use crate::{register_functions, shared_classifier};

/// Everything `load_extension()` does for one connection: obtain the shared
/// classifier and register the three functions.
///
/// A classifier that failed to open is not an error here; `filetype` reports
/// it instead. Only a failed registration makes the load fail.
pub fn init_connection(conn: &Connection, config: XcuConfig) -> rusqlite::Result<()> {
    let classifier = shared_classifier(&config.classifier);
    if let Some(failure) = classifier.init_failure() {
        tracing::warn!("filetype() will report {failure}");
    }
    register_functions(conn, classifier, config.paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::SLOT_TEST_LOCK;
    use tempfile::TempDir;
    use xcu_core::ClassifierConfig;

    #[test]
    fn test_init_with_broken_config_and_failed_classifier() {
        let _guard = SLOT_TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[classifier\nfollow_symlinks = ").unwrap();

        let mut config = XcuConfig::load_or_default_from(&config_path);
        assert_eq!(config, XcuConfig::default());

        config.classifier = ClassifierConfig {
            database: Some(dir.path().join("missing.mgc")),
            ..Default::default()
        };

        let conn = Connection::open_in_memory().unwrap();
        init_connection(&conn, config).unwrap();

        let row: (String, String, String) = conn
            .query_row(
                "SELECT basename('/a/b/'), dirname('/a/b/'), filetype('/etc/hostname')",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(
            row,
            (
                "b".to_string(),
                "/a".to_string(),
                "[Call to libmagic:magic_load() failed]".to_string()
            )
        );

        let again: String = conn
            .query_row("SELECT filetype(?1)", [dir.path().to_string_lossy()], |row| row.get(0))
            .unwrap();
        assert_eq!(again, "[Call to libmagic:magic_load() failed]");
    }

    #[test]
    fn test_init_applies_path_limits() {
        let _guard = SLOT_TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let mut config = XcuConfig::default();
        config.paths.max_len = 4;

        let conn = Connection::open_in_memory().unwrap();
        init_connection(&conn, config).unwrap();

        let base: String = conn.query_row("SELECT basename('/abc/def')", [], |row| row.get(0)).unwrap();
        assert_eq!(base, "abc");
    }
}
