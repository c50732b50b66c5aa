use std::sync::{Arc, Mutex, Weak};

use xcu_core::{ClassifierConfig, FileClassifier};

struct Shared {
    config: ClassifierConfig,
    classifier: Weak<FileClassifier>,
}

static SHARED: Mutex<Option<Shared>> = Mutex::new(None);

/// Serializes tests that go through the process-wide slot.
#[cfg(test)]
pub(crate) static SLOT_TEST_LOCK: Mutex<()> = Mutex::new(());

/// The process-wide classifier, opened on first use.
///
/// Every connection that loads the extension shares one instance while any
/// of them is open, even if it brings a different `config`. Once the last one
/// closes the handle is released, and the next load opens a fresh one with
/// whatever `config` it brings.
pub fn shared_classifier(config: &ClassifierConfig) -> Arc<FileClassifier> {
    let mut slot = SHARED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(shared) = slot.as_ref() {
        if let Some(existing) = shared.classifier.upgrade() {
            if shared.config == *config {
                tracing::debug!("reusing the shared file classifier");
            } else {
                tracing::debug!(
                    "reusing the shared file classifier opened with {:?}; ignoring {:?}",
                    shared.config,
                    config
                );
            }
            return existing;
        }
    }

    let classifier = Arc::new(FileClassifier::open(config));
    *slot = Some(Shared {
        config: config.clone(),
        classifier: Arc::downgrade(&classifier),
    });
    classifier
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_is_empty() -> bool {
        SHARED
            .lock()
            .unwrap()
            .as_ref()
            .is_none_or(|shared| shared.classifier.upgrade().is_none())
    }

    #[test]
    fn test_shared_while_alive_released_after() {
        let _guard = SLOT_TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let config = ClassifierConfig::default();

        let first = shared_classifier(&config);
        let second = shared_classifier(&config);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(Arc::strong_count(&first), 2);

        drop(first);
        drop(second);
        assert!(slot_is_empty());

        let third = shared_classifier(&config);
        assert_eq!(Arc::strong_count(&third), 1);
    }

    #[test]
    fn test_live_instance_wins_over_other_config() {
        let _guard = SLOT_TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let broken = ClassifierConfig {
            database: Some("/nonexistent/xcu/magic.mgc".into()),
            ..Default::default()
        };

        let first = shared_classifier(&broken);
        let second = shared_classifier(&ClassifierConfig::default());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.init_failure(), Some(xcu_core::InitFailure::Load));

        drop(first);
        drop(second);
        assert!(slot_is_empty());
    }
}
