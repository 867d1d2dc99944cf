use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A property value in a template: either a literal or an intrinsic function
/// the provisioning engine resolves at deploy time.
///
/// Deferred values (`Ref`, `Fn::GetAtt`) are opaque placeholders here. They
/// only become concrete strings inside the engine, after the referenced
/// resource exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    /// `{"Ref": "LogicalId"}`: the resource's primary locator.
    Ref {
        #[serde(rename = "Ref")]
        target: String,
    },
    /// `{"Fn::GetAtt": ["LogicalId", "Attribute"]}`: a deferred output attribute.
    GetAtt {
        #[serde(rename = "Fn::GetAtt")]
        target: (String, String),
    },
    /// `{"Fn::Join": ["sep", [...]]}`.
    Join {
        #[serde(rename = "Fn::Join")]
        parts: (String, Vec<Expr>),
    },
    /// `{"Fn::Select": [index, list]}`.
    Select {
        #[serde(rename = "Fn::Select")]
        args: (u32, Box<Expr>),
    },
    /// `{"Fn::GetAZs": ""}`: availability zones of the deployment region.
    GetAzs {
        #[serde(rename = "Fn::GetAZs")]
        region: String,
    },
    Literal(String),
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Self::Ref {
            target: target.into(),
        }
    }

    pub fn get_att(target: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            target: (target.into(), attribute.into()),
        }
    }

    pub fn join(separator: impl Into<String>, parts: Vec<Expr>) -> Self {
        Self::Join {
            parts: (separator.into(), parts),
        }
    }

    /// The `index`-th availability zone of the current region.
    #[must_use]
    pub fn availability_zone(index: u32) -> Self {
        Self::Select {
            args: (
                index,
                Box::new(Self::GetAzs {
                    region: String::new(),
                }),
            ),
        }
    }

    /// Pseudo-parameter reference such as `AWS::Partition`.
    pub fn pseudo(name: &str) -> Self {
        Self::reference(format!("AWS::{name}"))
    }

    /// True when the value is only known after provisioning.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        match self {
            Self::Literal(_) => false,
            Self::Join { parts } => parts.1.iter().any(Self::is_deferred),
            _ => true,
        }
    }

    /// Logical ids this expression points at (pseudo-parameters excluded).
    #[must_use]
    pub fn targets(&self) -> BTreeSet<String> {
        references(&self.to_value())
    }

    /// JSON form as it appears in a template.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(s) => Value::String(s.clone()),
            Self::Ref { target } => json!({ "Ref": target }),
            Self::GetAtt { target } => json!({ "Fn::GetAtt": [target.0, target.1] }),
            Self::Join { parts } => {
                let items: Vec<Value> = parts.1.iter().map(Self::to_value).collect();
                json!({ "Fn::Join": [parts.0, items] })
            }
            Self::Select { args } => json!({ "Fn::Select": [args.0, args.1.to_value()] }),
            Self::GetAzs { region } => json!({ "Fn::GetAZs": region }),
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        expr.to_value()
    }
}

/// Collect every logical id referenced via `Ref` or `Fn::GetAtt` anywhere in
/// a property tree.
///
/// Pseudo-parameters (`AWS::Region`, `AWS::Partition`, ...) are not resources
/// and are skipped.
#[must_use]
pub fn references(value: &Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect(value, &mut out);
    out
}

fn collect(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !target.starts_with("AWS::") {
                        out.insert(target.clone());
                    }
                    return;
                }
                if let Some(att) = map.get("Fn::GetAtt") {
                    match att {
                        Value::Array(items) => {
                            if let Some(Value::String(target)) = items.first() {
                                out.insert(target.clone());
                            }
                        }
                        Value::String(dotted) => {
                            if let Some((target, _)) = dotted.split_once('.') {
                                out.insert(target.to_string());
                            }
                        }
                        _ => {}
                    }
                    return;
                }
            }
            for v in map.values() {
                collect(v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect(v, out);
            }
        }
        _ => {}
    }
}
