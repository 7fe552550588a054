//! Query-string decoding with bracket nesting.
//!
//! `a[b]=1` decodes to `{"a": {"b": "1"}}`, `a[]=1&a[]=2` and `a=1&a=2` both
//! decode to `{"a": ["1", "2"]}`. Keys and values are percent- and
//! `+`-decoded by `url::form_urlencoded`. Used for the request search string
//! and for `application/x-www-form-urlencoded` bodies.

use serde_json::{Map, Value};
use url::form_urlencoded;

pub fn parse(input: &str) -> Value {
    let input = input.strip_prefix('?').unwrap_or(input);
    let mut root = Map::new();

    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        let segments = split_key(&key);
        assign(&mut root, &segments, value.into_owned());
    }

    Value::Object(root)
}

/// Bracket segments beyond this depth stay together as one literal segment.
const MAX_DEPTH: usize = 5;

/// `a[b][]` -> `["a", "b", ""]`. Keys with unbalanced brackets, or that start
/// with one, are kept whole. Past [`MAX_DEPTH`] brackets the remainder of the
/// key, brackets included, becomes the last segment.
fn split_key(key: &str) -> Vec<&str> {
    let open = match key.find('[') {
        Some(0) | None => return vec![key],
        Some(open) => open,
    };

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        if segments.len() > MAX_DEPTH {
            segments.push(rest);
            return segments;
        }
        match inner.find(']') {
            Some(close) => {
                segments.push(&inner[..close]);
                rest = &inner[close + 1..];
            }
            None => return vec![key],
        }
    }

    if !rest.is_empty() {
        return vec![key];
    }
    segments
}

fn is_index(segment: &str) -> bool {
    segment.is_empty() || segment.parse::<usize>().is_ok()
}

fn container_for(segment: &str) -> Value {
    if is_index(segment) {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn assign(target: &mut Map<String, Value>, segments: &[&str], value: String) {
    let (head, tail) = (segments[0], &segments[1..]);

    if tail.is_empty() {
        match target.get_mut(head) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, Value::String(value)]);
            }
            None => {
                target.insert(head.to_string(), Value::String(value));
            }
        }
        return;
    }

    let child = target
        .entry(head.to_string())
        .or_insert_with(|| container_for(tail[0]));
    assign_nested(child, tail, value);
}

fn assign_nested(slot: &mut Value, segments: &[&str], value: String) {
    let key = segments[0];

    match slot {
        Value::Array(items) if is_index(key) => {
            if segments.len() == 1 {
                items.push(Value::String(value));
                return;
            }

            let existing = key.parse::<usize>().ok().filter(|&i| i < items.len());
            match existing {
                Some(i) => assign_nested(&mut items[i], &segments[1..], value),
                None => {
                    let mut child = container_for(segments[1]);
                    assign_nested(&mut child, &segments[1..], value);
                    items.push(child);
                }
            }
        }
        Value::Array(items) => {
            // Named key into a list: switch to an index-keyed object.
            let map = items
                .drain(..)
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect::<Map<String, Value>>();
            *slot = Value::Object(map);
            assign_nested(slot, segments, value);
        }
        Value::Object(map) => assign(map, segments, value),
        _ => {
            *slot = container_for(key);
            assign_nested(slot, segments, value);
        }
    }
}
