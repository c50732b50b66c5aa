//! File-type classifier service backed by libmagic.
//!
//! A [`FileClassifier`] is built once and shared by reference. It is either
//! ready, holding a detector behind a mutex, or failed, holding the
//! [`InitFailure`] that every later query reports. The libmagic handle is
//! closed when the last owner drops the service.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use magic::Cookie;
use magic::cookie::{DatabasePaths, Flags, Load};

use crate::config::ClassifierConfig;
use crate::error::{InitFailure, Result, XcuError};

/// Something that can describe the content of a file.
pub trait Detector: Send {
    fn detect(&self, path: &Path) -> Result<String>;
}

/// libmagic cookie with a loaded signature database.
pub struct MagicDetector {
    cookie: Cookie<Load>,
}

// SAFETY: a libmagic cookie has no thread affinity. `FileClassifier` only
// reaches it through a mutex, so it is never used from two threads at once.
unsafe impl Send for MagicDetector {}

impl MagicDetector {
    pub fn open(config: &ClassifierConfig) -> std::result::Result<Self, InitFailure> {
        let mut flags = Flags::empty();
        if config.follow_symlinks {
            flags |= Flags::SYMLINK;
        }
        if config.report_errors {
            flags |= Flags::ERROR;
        }

        let cookie = Cookie::open(flags).map_err(|e| {
            tracing::warn!("magic_open failed: {e}");
            InitFailure::Open
        })?;

        let databases = match &config.database {
            Some(path) => DatabasePaths::try_from([path.as_path()]).map_err(|e| {
                tracing::warn!("Invalid magic database path {}: {e}", path.display());
                InitFailure::Load
            })?,
            None => DatabasePaths::default(),
        };

        let cookie = cookie.load(&databases).map_err(|e| {
            tracing::warn!("magic_load failed: {e}");
            InitFailure::Load
        })?;

        Ok(Self { cookie })
    }
}

impl Detector for MagicDetector {
    fn detect(&self, path: &Path) -> Result<String> {
        self.cookie.file(path).map_err(|e| XcuError::Classify(innermost_message(&e)))
    }
}

/// libmagic's explanation sits at the bottom of the error chain; the outer
/// layers only name the failing call.
fn innermost_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

enum State {
    Ready(Mutex<Box<dyn Detector>>),
    Failed(InitFailure),
}

pub struct FileClassifier {
    state: State,
}

impl FileClassifier {
    /// Open libmagic according to `config`. Never fails: an initialization
    /// error is kept in the returned service and reported on every query.
    pub fn open(config: &ClassifierConfig) -> Self {
        match MagicDetector::open(config) {
            Ok(detector) => {
                tracing::info!(
                    "libmagic ready (database: {})",
                    config
                        .database
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "default".to_string())
                );
                Self::with_detector(detector)
            }
            Err(failure) => Self::failed(failure),
        }
    }

    pub fn with_detector(detector: impl Detector + 'static) -> Self {
        Self {
            state: State::Ready(Mutex::new(Box::new(detector))),
        }
    }

    pub fn failed(failure: InitFailure) -> Self {
        tracing::warn!("File classifier disabled: {failure}");
        Self {
            state: State::Failed(failure),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn init_failure(&self) -> Option<InitFailure> {
        match self.state {
            State::Ready(_) => None,
            State::Failed(failure) => Some(failure),
        }
    }

    /// Describe the file at `path`.
    pub fn classify(&self, path: &Path) -> Result<String> {
        match &self.state {
            State::Failed(failure) => Err(XcuError::ClassifierInit(*failure)),
            State::Ready(detector) => lock(detector).detect(path),
        }
    }

    /// Like [`FileClassifier::classify`], but folds every failure into text:
    /// the fixed diagnostic after a failed init, libmagic's message otherwise.
    pub fn describe(&self, path: &Path) -> String {
        match self.classify(path) {
            Ok(description) => description,
            Err(XcuError::ClassifierInit(failure)) => failure.to_string(),
            Err(XcuError::Classify(message)) => message,
            Err(other) => other.to_string(),
        }
    }
}

fn lock(detector: &Mutex<Box<dyn Detector>>) -> MutexGuard<'_, Box<dyn Detector>> {
    // A panic while classifying leaves nothing half-updated on our side.
    detector.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
