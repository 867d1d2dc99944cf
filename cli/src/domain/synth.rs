//! Template synthesis and content digests.

use std::fmt::Write as _;

use serde_json::Value;
use sha2::{Digest, Sha256};
use threetier_common::Template;

use crate::domain::topology::Topology;

/// Render a declaration set as a template.
#[must_use]
pub fn synthesize(topology: &Topology) -> Template {
    let mut template = Template::new(topology.description.clone());
    template.resources = topology.resources().clone();
    template.outputs = topology.outputs().clone();
    template
}

/// SHA-256 of the template's canonical JSON (object keys sorted, no
/// whitespace), as lowercase hex.
#[must_use]
pub fn template_digest(template: &Template) -> String {
    let value = serde_json::to_value(template).unwrap_or(Value::Null);
    let mut canonical = String::new();
    write_canonical(&value, &mut canonical);
    hex_encode(&Sha256::digest(canonical.as_bytes()))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
