//! SQLite functions `basename(path)`, `dirname(path)` and `filetype(path)`.
//!
//! Built with the `loadable_extension` feature this crate is a shared library
//! for `load_extension()`. With the default `bundled` feature it is a plain
//! library that registers the same functions on any rusqlite connection.

#[cfg(feature = "loadable_extension")]
mod entry;
mod functions;
mod init;
mod service;

pub use functions::register_functions;
pub use init::init_connection;
pub use service::shared_classifier;
