//! Hydration source generation.
//!
//! Produces one JSX document that, executed in the browser, mounts each
//! component into its DOM anchor:
//!
//! ```text
//! /** @jsx h */
//! <import header>
//! <component source>
//! hydrate(<Name />, document.getElementById("<anchor>"),true);
//! ...
//! ```

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Import header used when a route does not supply its own.
pub const DEFAULT_IMPORT: &str =
    r#"import {  h, hydrate,Component,Fragment} from "https://crux.land/bin@nano_jsx";"#;

/// Pragma selecting `h` as the JSX factory.
pub const JSX_PRAGMA: &str = "/** @jsx h */";

static EXPORTED_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*export\s+class\s+(\S+)\s+extends\s+Component\s+").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("no `export class <Name> extends Component` found in component source")]
    MissingComponentName,

    #[error("`{0}` is not a valid component identifier")]
    InvalidIdentifier(String),

    #[error("mount element id must not be empty")]
    EmptyMountId,
}

/// A component to hydrate on the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrateComponent {
    name: String,
    source: String,
    mount_id: String,
    clear_children: bool,
}

impl HydrateComponent {
    /// Describe a component whose exported identifier is `name`.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        mount_id: impl Into<String>,
    ) -> Result<Self, CodegenError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(CodegenError::InvalidIdentifier(name));
        }
        let mount_id = mount_id.into();
        if mount_id.is_empty() {
            return Err(CodegenError::EmptyMountId);
        }
        Ok(Self {
            name,
            source: source.into(),
            mount_id,
            clear_children: true,
        })
    }

    /// Describe a component, taking its identifier from the exported class
    /// declaration in `source`.
    pub fn from_source(
        source: impl Into<String>,
        mount_id: impl Into<String>,
    ) -> Result<Self, CodegenError> {
        let source = source.into();
        let name = extract_component_name(&source).ok_or(CodegenError::MissingComponentName)?;
        Self::new(name, source, mount_id)
    }

    /// Whether existing children of the anchor are removed before mounting.
    pub fn clear_children(mut self, clear: bool) -> Self {
        self.clear_children = clear;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn mount_id(&self) -> &str {
        &self.mount_id
    }

    pub fn clears_children(&self) -> bool {
        self.clear_children
    }

    fn mount_statement(&self) -> String {
        // JSON string syntax is a valid JS string literal.
        let anchor = serde_json::Value::String(self.mount_id.clone()).to_string();
        format!(
            "hydrate(<{} />, document.getElementById({}),{});",
            self.name, anchor, self.clear_children
        )
    }
}

/// The identifier of the first `export class X extends Component` in `source`.
pub fn extract_component_name(source: &str) -> Option<String> {
    // The pattern needs trailing whitespace after `Component`.
    let padded = format!("{source}\n");
    EXPORTED_CLASS
        .captures(&padded)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Generate the hydration document for `components`, in order.
pub fn generate(components: &[HydrateComponent], import_header: &str) -> String {
    let body = components
        .iter()
        .map(|c| format!("{}\n{}", c.source, c.mount_statement()))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{JSX_PRAGMA}\n{import_header}\n{body}")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = "export class Counter extends Component {\n  render() { return <p>0</p> }\n}";

    #[test]
    fn test_extracts_exported_class() {
        assert_eq!(extract_component_name(COUNTER), Some("Counter".to_string()));
        assert_eq!(
            extract_component_name("export class Foo extends Component {...}"),
            Some("Foo".to_string())
        );
        assert_eq!(extract_component_name("function Foo() {}"), None);
        assert_eq!(extract_component_name("export class Foo extends Base {}"), None);
    }

    #[test]
    fn test_mount_defaults_to_clearing_children() {
        let component =
            HydrateComponent::from_source("export class Foo extends Component {...}", "a").unwrap();
        let code = generate(&[component], DEFAULT_IMPORT);
        assert!(code.contains(r#"hydrate(<Foo />, document.getElementById("a"),true);"#));
    }

    #[test]
    fn test_document_layout() {
        let first = HydrateComponent::new("Counter", COUNTER, "counter").unwrap();
        let second = HydrateComponent::new("Clock", "export class Clock extends Component {}", "clock")
            .unwrap()
            .clear_children(false);

        let code = generate(&[first, second], "import { h } from \"x\";");
        let expected = format!(
            "/** @jsx h */\nimport {{ h }} from \"x\";\n{COUNTER}\nhydrate(<Counter />, document.getElementById(\"counter\"),true);\nexport class Clock extends Component {{}}\nhydrate(<Clock />, document.getElementById(\"clock\"),false);"
        );
        assert_eq!(code, expected);
    }

    #[test]
    fn test_missing_class_is_an_error() {
        assert_eq!(
            HydrateComponent::from_source("const x = 1;", "a"),
            Err(CodegenError::MissingComponentName)
        );
    }

    #[test]
    fn test_rejects_bad_descriptors() {
        assert!(matches!(
            HydrateComponent::new("not valid", "", "a"),
            Err(CodegenError::InvalidIdentifier(_))
        ));
        assert_eq!(
            HydrateComponent::new("Foo", "", ""),
            Err(CodegenError::EmptyMountId)
        );
    }

    #[test]
    fn test_mount_id_is_escaped() {
        let component = HydrateComponent::new("Foo", "", "a\"b").unwrap();
        let code = generate(&[component], DEFAULT_IMPORT);
        assert!(code.contains(r#"document.getElementById("a\"b")"#));
    }
}
