//! JSON-patch-style structural diffs between successive snapshots.
//!
//! Objects are compared recursively; arrays and scalars are atomic and
//! replaced wholesale when unequal. Paths use JSON-pointer syntax with
//! the standard `~0`/`~1` token escapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One add/replace/remove operation transforming a base document into
/// its successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add {
        path: String,
        value: Value,
    },
    Replace {
        path: String,
        value: Value,
    },
    Remove {
        path: String,
    },
}

impl PatchOp {
    /// Pointer path of the operation.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. } | Self::Replace { path, .. } | Self::Remove { path } => path,
        }
    }
}

/// Compute the structural diff transforming `base` into `next`.
///
/// An empty result means the documents are identical; callers suppress
/// the event entirely in that case.
#[must_use]
pub fn diff(base: &Value, next: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_at("", base, next, &mut ops);
    ops
}

fn diff_at(path: &str, base: &Value, next: &Value, ops: &mut Vec<PatchOp>) {
    match (base, next) {
        (Value::Object(base_map), Value::Object(next_map)) => {
            for (key, base_value) in base_map {
                let child = child_path(path, key);
                match next_map.get(key) {
                    Some(next_value) => diff_at(&child, base_value, next_value, ops),
                    None => ops.push(PatchOp::Remove { path: child }),
                }
            }
            for (key, next_value) in next_map {
                if !base_map.contains_key(key) {
                    ops.push(PatchOp::Add {
                        path: child_path(path, key),
                        value: next_value.clone(),
                    });
                }
            }
        }
        _ => {
            if base != next {
                ops.push(PatchOp::Replace {
                    path: path.to_string(),
                    value: next.clone(),
                });
            }
        }
    }
}

fn child_path(parent: &str, key: &str) -> String {
    format!("{parent}/{}", escape_token(key))
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
