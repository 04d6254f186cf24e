use serde::{Deserialize, Serialize};

/// One name brought in (or sent out) by an import/export statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSpecifier {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_namespace: bool,
}

impl ImportSpecifier {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            is_default: false,
            is_namespace: false,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            alias,
            ..Self::named(name)
        }
    }

    pub fn default_import(local: impl Into<String>) -> Self {
        Self {
            name: "default".to_string(),
            alias: Some(local.into()),
            is_default: true,
            is_namespace: false,
        }
    }

    pub fn namespace(local: impl Into<String>) -> Self {
        Self {
            name: "*".to_string(),
            alias: Some(local.into()),
            is_default: false,
            is_namespace: true,
        }
    }
}

/// An import statement as written in the source.
///
/// `source` is the module specifier. Parsers may rewrite language-specific
/// relative forms into path form (`./x`, `../x`) so the graph builder can
/// resolve them; anything else is left verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportInfo {
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specifiers: Vec<ImportSpecifier>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub type_only: bool,
    pub line: usize,
}

impl ImportInfo {
    pub fn new(source: impl Into<String>, line: usize) -> Self {
        Self {
            source: source.into(),
            specifiers: Vec::new(),
            type_only: false,
            line,
        }
    }

    /// Names this import binds from the target, as recorded on graph edges.
    pub fn imported_names(&self) -> Vec<String> {
        self.specifiers.iter().map(|s| s.name.clone()).collect()
    }
}

/// An export statement. `source` is set for re-exports (`export * from "./x"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specifiers: Vec<ImportSpecifier>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub type_only: bool,
    pub line: usize,
}

impl ExportInfo {
    pub fn local(specifiers: Vec<ImportSpecifier>, line: usize) -> Self {
        Self {
            source: None,
            specifiers,
            type_only: false,
            line,
        }
    }

    /// Local names made public by this export (the alias is the public name).
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.specifiers
            .iter()
            .filter(|_| self.source.is_none())
            .map(|s| s.name.as_str())
    }
}
