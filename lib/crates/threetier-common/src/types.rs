use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `Key`/`Value` tag in list form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One Elastic Beanstalk option setting.
///
/// `value` is a JSON value rather than a string because it may carry an
/// unresolved intrinsic (`Ref`, `Fn::GetAtt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionSetting {
    pub namespace: String,
    pub option_name: String,
    pub value: Value,
}

impl OptionSetting {
    pub fn new(namespace: impl Into<String>, option_name: impl Into<String>, value: Value) -> Self {
        Self {
            namespace: namespace.into(),
            option_name: option_name.into(),
            value,
        }
    }

    /// `(namespace, option_name)`: settings with equal keys overwrite each other.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.namespace, &self.option_name)
    }
}
