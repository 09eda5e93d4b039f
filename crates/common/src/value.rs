// Dotted-path access into structured values, e.g. `refs.related[0]`.
//
// Reads return `None` for any missing segment (absent, not an error).
// Writes create missing intermediate mappings; sequence indices may point
// at an existing element or one past the end (append), nothing else.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueWriteError {
    #[error("field path is empty or malformed: `{0}`")]
    MalformedPath(String),

    #[error("segment `{segment}` is not a mapping or sequence")]
    NotAContainer { segment: String },

    #[error("index {index} is out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// One parsed segment of a dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Parse `a.b[0].c` into segments. Returns `None` for malformed paths.
fn parse_segments(path: &str) -> Option<Vec<Segment>> {
    if path.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return None;
        }

        let mut rest = part;
        let key_end = rest.find('[').unwrap_or(rest.len());
        let key = &rest[..key_end];
        if key.is_empty() {
            return None;
        }
        segments.push(Segment::Key(key.to_string()));
        rest = &rest[key_end..];

        while let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped.find(']')?;
            let index: usize = stripped[..close].parse().ok()?;
            segments.push(Segment::Index(index));
            rest = &stripped[close + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    Some(segments)
}

/// Read the value at a dotted path. Absent segments yield `None`.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_segments(path)?;
    let mut current = root;
    for segment in &segments {
        current = match segment {
            Segment::Key(key) => current.as_object()?.get(key)?,
            Segment::Index(index) => current.as_array()?.get(*index)?,
        };
    }
    Some(current)
}

/// Write `value` at a dotted path, creating intermediate mappings.
///
/// A sequence index must address an existing element or the position one
/// past the end (append). Intermediate sequences are never created.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> Result<(), ValueWriteError> {
    let segments =
        parse_segments(path).ok_or_else(|| ValueWriteError::MalformedPath(path.to_string()))?;

    let mut current = root;
    for (position, segment) in segments.iter().enumerate() {
        let last = position + 1 == segments.len();
        match segment {
            Segment::Key(key) => {
                let map = current
                    .as_object_mut()
                    .ok_or_else(|| ValueWriteError::NotAContainer { segment: key.clone() })?;
                if last {
                    map.insert(key.clone(), value);
                    return Ok(());
                }
                current = map.entry(key.clone()).or_insert_with(|| Value::Object(Default::default()));
            }
            Segment::Index(index) => {
                let seq = current.as_array_mut().ok_or_else(|| ValueWriteError::NotAContainer {
                    segment: format!("[{index}]"),
                })?;
                if *index > seq.len() {
                    return Err(ValueWriteError::IndexOutOfRange { index: *index, len: seq.len() });
                }
                if *index == seq.len() {
                    if !last {
                        return Err(ValueWriteError::IndexOutOfRange {
                            index: *index,
                            len: seq.len(),
                        });
                    }
                    seq.push(value);
                    return Ok(());
                }
                if last {
                    seq[*index] = value;
                    return Ok(());
                }
                current = &mut seq[*index];
            }
        }
    }

    Err(ValueWriteError::MalformedPath(path.to_string()))
}
