use std::borrow::Cow;
use std::sync::Arc;

use rusqlite::Connection;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;

use xcu_core::{FileClassifier, PathsConfig, XcuError, paths};

/// Register `basename`, `dirname` and `filetype` on `conn`.
///
/// The closures own a reference to `classifier`; SQLite drops them when the
/// connection closes, so the libmagic handle lives exactly as long as its
/// last user.
pub fn register_functions(
    conn: &Connection,
    classifier: Arc<FileClassifier>,
    limits: PathsConfig,
) -> rusqlite::Result<()> {
    let pure = FunctionFlags::SQLITE_UTF8
        | FunctionFlags::SQLITE_DETERMINISTIC
        | FunctionFlags::SQLITE_INNOCUOUS;

    conn.create_scalar_function("basename", 1, pure, move |ctx| {
        split_with(ctx, &limits, paths::basename)
    })?;
    conn.create_scalar_function("dirname", 1, pure, move |ctx| {
        split_with(ctx, &limits, paths::dirname)
    })?;
    // Depends on the filesystem, so neither deterministic nor innocuous.
    conn.create_scalar_function("filetype", 1, FunctionFlags::SQLITE_UTF8, move |ctx| {
        filetype(ctx, &classifier, &limits)
    })?;

    tracing::debug!("registered basename, dirname, filetype (max path {} bytes)", limits.max_len);
    Ok(())
}

fn split_with(
    ctx: &Context<'_>,
    limits: &PathsConfig,
    split: fn(&[u8]) -> &[u8],
) -> rusqlite::Result<Option<String>> {
    let Some(raw) = path_arg(ctx) else {
        return Ok(None);
    };
    let path = paths::prepare(&raw, limits).map_err(user_error)?;
    Ok(Some(String::from_utf8_lossy(split(path)).into_owned()))
}

fn filetype(
    ctx: &Context<'_>,
    classifier: &FileClassifier,
    limits: &PathsConfig,
) -> rusqlite::Result<Option<String>> {
    // A failed classifier answers with its diagnostic whatever the input.
    if let Some(failure) = classifier.init_failure() {
        return Ok(Some(failure.to_string()));
    }
    let Some(raw) = path_arg(ctx) else {
        return Ok(None);
    };
    let path = paths::prepare(&raw, limits).map_err(user_error)?;
    Ok(Some(classifier.describe(&paths::as_path(path))))
}

/// The single argument as bytes, the way SQLite would render it as text.
fn path_arg<'a>(ctx: &'a Context<'_>) -> Option<Cow<'a, [u8]>> {
    match ctx.get_raw(0) {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(Cow::Borrowed(bytes)),
        ValueRef::Integer(i) => Some(Cow::Owned(i.to_string().into_bytes())),
        ValueRef::Real(f) => Some(Cow::Owned(real_text(f).into_bytes())),
    }
}

/// REAL as SQLite renders it with `%!.15g`: 15 significant digits, trailing
/// zeros dropped but at least one digit after the point, and a signed
/// two-digit exponent outside `1e-4..1e15`.
fn real_text(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if f == 0.0 {
        return "0.0".to_string();
    }

    // Rust rounds to 15 significant digits here, carry into the exponent included.
    let sci = format!("{:.14e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    let mut out = String::with_capacity(24);
    if f < 0.0 {
        out.push('-');
    }
    if !(-4..=14).contains(&exp) {
        out.push_str(&digits[..1]);
        out.push('.');
        push_fraction(&mut out, &digits[1..]);
        out.push('e');
        out.push(if exp < 0 { '-' } else { '+' });
        out.push_str(&format!("{:02}", exp.unsigned_abs()));
    } else if exp >= 0 {
        let point = exp as usize + 1;
        out.push_str(&digits[..point]);
        out.push('.');
        push_fraction(&mut out, &digits[point..]);
    } else {
        out.push_str("0.");
        for _ in 1..-exp {
            out.push('0');
        }
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

fn push_fraction(out: &mut String, fraction: &str) {
    let fraction = fraction.trim_end_matches('0');
    out.push_str(if fraction.is_empty() { "0" } else { fraction });
}

fn user_error(e: XcuError) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(Box::new(e))
}
