//! Entry points SQLite calls from `load_extension()`.

use std::os::raw::{c_char, c_int};

use rusqlite::{Connection, ffi};
use xcu_core::XcuConfig;

use crate::init_connection;

/// Generic entry point, used when the caller names it or SQLite cannot
/// derive one from the file name.
///
/// # Safety
/// Called by SQLite with a valid connection, error slot and API table.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sqlite3_extension_init(
    db: *mut ffi::sqlite3,
    pz_err_msg: *mut *mut c_char,
    p_api: *mut ffi::sqlite3_api_routines,
) -> c_int {
    unsafe { Connection::extension_init2(db, pz_err_msg, p_api, extension_init) }
}

/// Entry point SQLite derives from `libxcu_ext.so`.
///
/// # Safety
/// Same contract as [`sqlite3_extension_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sqlite3_xcuext_init(
    db: *mut ffi::sqlite3,
    pz_err_msg: *mut *mut c_char,
    p_api: *mut ffi::sqlite3_api_routines,
) -> c_int {
    unsafe { sqlite3_extension_init(db, pz_err_msg, p_api) }
}

fn extension_init(db: Connection) -> rusqlite::Result<bool> {
    init_connection(&db, XcuConfig::load_or_default())?;
    // Not persistent: the functions go away with this connection.
    Ok(false)
}
