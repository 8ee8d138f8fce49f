//! The canonical JSON writer.

use crate::errors::CanonicalError;
use crate::number::{format_f64, format_i64, format_u64};
use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

/// Render the canonical form of a block.
///
/// Output is `{"refs":…,"state":…,"type":…}` with every rule of the crate
/// docs applied. Arrays under `refs` are sorted (set semantics); arrays under
/// `state` keep their declared order.
pub fn canonical(
    block_type: &str,
    state: &Map<String, Value>,
    refs: &Map<String, Value>,
) -> Result<String, CanonicalError> {
    let mut out = String::with_capacity(64);
    out.push_str("{\"refs\":");
    write_object(&mut out, refs, true)?;
    out.push_str(",\"state\":");
    write_object(&mut out, state, false)?;
    out.push_str(",\"type\":");
    write_string(&mut out, block_type);
    out.push('}');
    Ok(out)
}

/// Render an arbitrary JSON value with the canonical object rules.
///
/// Used for signing payloads that are not blocks (discovery documents,
/// handshake payloads). Arrays preserve order, matching `state` semantics.
pub fn canonical_value(value: &Value) -> Result<String, CanonicalError> {
    let mut out = String::new();
    write_value(&mut out, value, false)?;
    Ok(out)
}

fn write_value(out: &mut String, value: &Value, sort_arrays: bool) -> Result<(), CanonicalError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&format_i64(i));
            } else if let Some(u) = n.as_u64() {
                out.push_str(&format_u64(u));
            } else if let Some(f) = n.as_f64() {
                out.push_str(&format_f64(f));
            } else {
                return Err(CanonicalError::NonFiniteNumber);
            }
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => write_array(out, items, sort_arrays)?,
        Value::Object(map) => write_object(out, map, sort_arrays)?,
    }
    Ok(())
}

fn write_array(out: &mut String, items: &[Value], sort: bool) -> Result<(), CanonicalError> {
    // Nulls carry no information and are elided in both set and sequence
    // semantics.
    let mut rendered = Vec::with_capacity(items.len());
    for item in items {
        if item.is_null() {
            continue;
        }
        let mut buf = String::new();
        write_value(&mut buf, item, sort)?;
        rendered.push(buf);
    }
    if sort {
        rendered.sort();
    }

    out.push('[');
    for (i, item) in rendered.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(item);
    }
    out.push(']');
    Ok(())
}

fn write_object(
    out: &mut String,
    map: &Map<String, Value>,
    sort_arrays: bool,
) -> Result<(), CanonicalError> {
    let mut entries: Vec<(String, &Value)> = Vec::with_capacity(map.len());
    for (key, value) in map {
        if value.is_null() {
            continue;
        }
        entries.push((key.nfc().collect(), value));
    }
    // Code-point order; UTF-8 byte order is code-point order.
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for pair in entries.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(CanonicalError::DuplicateKey(pair[0].0.clone()));
        }
    }

    out.push('{');
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_value(out, value, sort_arrays)?;
    }
    out.push('}');
    Ok(())
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.nfc() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
