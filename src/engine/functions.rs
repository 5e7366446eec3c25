//! SQL helper functions installed on every opened database.
//!
//! - `regexp(pattern, text)`: 1 if `text` matches, else 0 (backs `text REGEXP pattern`)
//! - `regexp_replace(pattern, text, replacement[, flags])`: replace the first
//!   match, or every match with the `g` flag; `i`, `m` and `s` map to the
//!   usual regex options. With fewer than three arguments the result is `''`.

use regex::{Regex, RegexBuilder};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::{Connection, Error, Result};
use std::collections::HashMap;

/// Compiled patterns kept per connection for `regexp_replace`.
const PATTERN_CACHE_LIMIT: usize = 64;

fn user_error(e: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::UserFunctionError(Box::new(e))
}

/// Register `regexp` and `regexp_replace` on `conn`.
pub fn register_functions(conn: &Connection) -> Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("regexp", 2, flags, |ctx| {
        let pattern = ctx.get_or_create_aux(0, |value| -> std::result::Result<Regex, Error> {
            Regex::new(value.as_str().map_err(user_error)?).map_err(user_error)
        })?;
        let Some(text) = ctx.get::<Option<String>>(1)? else {
            return Ok(None);
        };
        Ok(Some(pattern.is_match(&text)))
    })?;

    let mut cache: HashMap<(String, String), Regex> = HashMap::new();
    conn.create_scalar_function("regexp_replace", -1, flags, move |ctx| {
        replace(ctx, &mut cache)
    })?;

    Ok(())
}

fn replace(ctx: &Context<'_>, cache: &mut HashMap<(String, String), Regex>) -> Result<String> {
    if ctx.len() < 3 {
        return Ok(String::new());
    }
    let pattern: String = ctx.get(0)?;
    let text: String = ctx.get(1)?;
    let replacement: String = ctx.get(2)?;
    let flags: String = if ctx.len() > 3 {
        ctx.get::<Option<String>>(3)?.unwrap_or_default()
    } else {
        String::new()
    };

    let key = (pattern, flags);
    if !cache.contains_key(&key) {
        if cache.len() >= PATTERN_CACHE_LIMIT {
            cache.clear();
        }
        let regex = RegexBuilder::new(&key.0)
            .case_insensitive(key.1.contains('i'))
            .multi_line(key.1.contains('m'))
            .dot_matches_new_line(key.1.contains('s'))
            .build()
            .map_err(user_error)?;
        cache.insert(key.clone(), regex);
    }
    let Some(regex) = cache.get(&key) else {
        return Ok(text);
    };

    let replaced = if key.1.contains('g') {
        regex.replace_all(&text, replacement.as_str())
    } else {
        regex.replace(&text, replacement.as_str())
    };
    Ok(replaced.into_owned())
}
