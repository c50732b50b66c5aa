pub mod classifier;
pub mod config;
pub mod error;
pub mod paths;

pub use classifier::{Detector, FileClassifier, MagicDetector};
pub use config::{ClassifierConfig, PathsConfig, XcuConfig};
pub use error::{InitFailure, Result, XcuError};
pub use paths::{PATH_MAX, basename, dirname};
