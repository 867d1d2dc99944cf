pub mod expr;
pub mod keys;
pub mod template;
pub mod types;

pub use expr::{Expr, references};
pub use keys::{env_vars, namespaces, resource_types};
pub use template::{OutputDecl, ResourceDecl, RetentionPolicy, Template, TemplateError};
pub use types::{OptionSetting, Tag};
