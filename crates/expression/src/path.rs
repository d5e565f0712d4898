//! JSONPath-style dotted traversal: `a.b.c` and `a[0]` on list-typed
//! intermediates. Out-of-bounds or missing keys yield `null`, never an
//! error (§4.2).

use serde_json::Value;

/// A single path segment: a map key, or a list index.
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Parse `a.b[0].c` into segments. Tolerant of malformed bracket syntax —
/// anything it can't parse as an index is treated as a literal key so
/// traversal degrades to "missing key" (null) rather than panicking.
fn parse_segments(path: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    for dotted in path.split('.') {
        if dotted.is_empty() {
            continue;
        }
        let mut rest = dotted;
        // Pull the leading key off, if any, before any `[n]` suffixes.
        if let Some(bracket_pos) = rest.find('[') {
            let (key, tail) = rest.split_at(bracket_pos);
            if !key.is_empty() {
                segments.push(Segment::Key(key));
            }
            rest = tail;
            while let Some(end) = rest.find(']') {
                let inside = &rest[1..end];
                match inside.parse::<usize>() {
                    Ok(idx) => segments.push(Segment::Index(idx)),
                    Err(_) => segments.push(Segment::Key(inside)),
                }
                rest = &rest[end + 1..];
                if !rest.starts_with('[') {
                    break;
                }
            }
        } else {
            segments.push(Segment::Key(rest));
        }
    }
    segments
}

/// Traverse `value` following `path`. Missing keys, out-of-bounds indices,
/// or indexing into a non-list all resolve to `Value::Null` rather than
/// erroring — the resolver suppresses lookup failures (§4.2).
#[must_use]
pub fn lookup(value: &Value, path: &str) -> Value {
    let segments = parse_segments(path);
    let mut current = value;
    for segment in &segments {
        let next = match (current, segment) {
            (Value::Object(map), Segment::Key(key)) => map.get(*key),
            (Value::Array(items), Segment::Index(idx)) => items.get(*idx),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Value::Null,
        }
    }
    current.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_path_into_nested_object() {
        let v = json!({"a": {"b": {"c": 42}}});
        assert_eq!(lookup(&v, "a.b.c"), json!(42));
    }

    #[test]
    fn bracket_index_into_array() {
        let v = json!({"items": [10, 20, 30]});
        assert_eq!(lookup(&v, "items[1]"), json!(20));
    }

    #[test]
    fn mixed_dotted_and_bracket_path() {
        let v = json!({"a": {"list": [{"x": 1}, {"x": 2}]}});
        assert_eq!(lookup(&v, "a.list[1].x"), json!(2));
    }

    #[test]
    fn missing_key_yields_null() {
        let v = json!({"a": 1});
        assert_eq!(lookup(&v, "b.c"), Value::Null);
    }

    #[test]
    fn out_of_bounds_index_yields_null() {
        let v = json!({"items": [1, 2]});
        assert_eq!(lookup(&v, "items[5]"), Value::Null);
    }

    #[test]
    fn indexing_into_non_array_yields_null() {
        let v = json!({"a": 1});
        assert_eq!(lookup(&v, "a[0]"), Value::Null);
    }

    #[test]
    fn empty_path_returns_the_value_itself() {
        let v = json!({"a": 1});
        assert_eq!(lookup(&v, ""), v);
    }
}
