//! `multipart/form-data` request bodies.
//!
//! Every part becomes one field of the returned JSON object. Plain inputs map
//! to their string value; file uploads map to
//! `{ "filename": ..., "contentType": ..., "data": ... }`.
//! The whole body is held in memory, which is fine for the small form posts
//! a storefront receives.

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

const FORMAT: &str = "multipart/form-data";

pub fn parse(body: &str, content_type: &str) -> Result<Value> {
    let boundary = boundary(content_type)?;
    let start = format!("--{}", boundary);
    let end = format!("--{}--", boundary);

    let mut fields = Map::new();
    let mut lines = body.split("\r\n");
    let mut current: Option<Part> = None;

    while let Some(line) = lines.next() {
        if line == start || line == end {
            if let Some(part) = current.take() {
                part.insert_into(&mut fields);
            }
            if line == end {
                break;
            }

            let mut part = Part::default();
            // Part headers run until the first empty line.
            for header in lines.by_ref() {
                if header.is_empty() {
                    break;
                }
                part.header(header)?;
            }
            if part.name.is_empty() {
                return Err(Error::body_parse(FORMAT, "part is missing a name"));
            }
            current = Some(part);
        } else if let Some(part) = current.as_mut() {
            if part.has_data {
                part.data.push_str("\r\n");
            }
            part.data.push_str(line);
            part.has_data = true;
        }
    }

    if let Some(part) = current.take() {
        part.insert_into(&mut fields);
    }

    Ok(Value::Object(fields))
}

fn boundary(content_type: &str) -> Result<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("boundary")
                .then(|| value.trim().trim_matches('"'))
        })
        .filter(|b| !b.is_empty())
        .ok_or_else(|| Error::body_parse(FORMAT, "missing boundary"))
}

#[derive(Default)]
struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: String,
    has_data: bool,
}

impl Part {
    fn header(&mut self, line: &str) -> Result<()> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::body_parse(FORMAT, format!("malformed part header: {}", line)))?;

        match name.trim().to_ascii_lowercase().as_str() {
            "content-disposition" => {
                for param in value.split(';').map(str::trim).skip(1) {
                    let Some((key, val)) = param.split_once('=') else {
                        continue;
                    };
                    let val = val.trim().trim_matches('"').to_string();
                    match key.trim() {
                        "name" => self.name = val,
                        "filename" => self.filename = Some(val),
                        _ => (),
                    }
                }
            }
            "content-type" => self.content_type = Some(value.trim().to_string()),
            _ => (),
        }
        Ok(())
    }

    fn insert_into(self, fields: &mut Map<String, Value>) {
        let value = match self.filename {
            Some(filename) => json!({
                "filename": filename,
                "contentType": self
                    .content_type
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                "data": self.data,
            }),
            None => Value::String(self.data),
        };
        fields.insert(self.name, value);
    }
}
