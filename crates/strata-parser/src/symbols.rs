use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Type,
    Enum,
    Constant,
    Variable,
    Method,
    Property,
    Module,
    Namespace,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Module => "module",
            SymbolKind::Namespace => "namespace",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    /// Visible inside the module, package or crate but not exported from it.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl Parameter {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: None,
            default_value: None,
            optional: false,
        }
    }
}

/// One extracted declaration.
///
/// `id` is unique within a module (and therefore within a manifest, since
/// it is prefixed with the module path). `parent_id`, when set, always
/// refers to a symbol of the same module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub visibility: Visibility,
    pub location: SourceLocation,
    pub exported: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Symbol {
    /// A bare symbol; the id is assigned when it is pushed into a [`SymbolSink`].
    pub fn new(name: impl Into<String>, kind: SymbolKind, location: SourceLocation) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            location,
            exported: false,
            parameters: Vec::new(),
            return_type: None,
            signature: None,
            parent_id: None,
            children_ids: Vec::new(),
            extends: Vec::new(),
            implements: Vec::new(),
            doc: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }

    pub fn with_doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc;
        self
    }

    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature;
        self
    }
}

/// Collects the symbols of one file and hands out unique, stable ids.
///
/// Top-level ids are `<path>#<name>`, nested ids `<parent-id>.<name>`.
/// A collision (overloads, redeclarations) gets a `~<line>` suffix, then a
/// counter if the line collides as well.
pub struct SymbolSink {
    file_path: String,
    symbols: Vec<Symbol>,
    used: HashSet<String>,
}

impl SymbolSink {
    pub fn new(file_path: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            symbols: Vec::new(),
            used: HashSet::new(),
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Push a symbol, optionally nested under `parent` (an id returned by an
    /// earlier push). Returns the assigned id.
    pub fn push(&mut self, mut symbol: Symbol, parent: Option<&str>) -> String {
        let base = match parent {
            Some(parent_id) => format!("{}.{}", parent_id, symbol.name),
            None => format!("{}#{}", self.file_path, symbol.name),
        };

        let mut id = base.clone();
        if self.used.contains(&id) {
            id = format!("{}~{}", base, symbol.location.line);
            let mut n = 2;
            while self.used.contains(&id) {
                id = format!("{}~{}-{}", base, symbol.location.line, n);
                n += 1;
            }
        }

        self.used.insert(id.clone());
        symbol.id = id.clone();
        symbol.parent_id = parent.map(String::from);
        self.symbols.push(symbol);
        id
    }

    /// First top-level symbol with the given name, e.g. the struct an
    /// `impl` block or a Go method receiver refers to.
    pub fn find_top_level(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|s| s.parent_id.is_none() && s.name == name)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Symbol> {
        self.symbols.iter_mut().find(|s| s.id == id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Symbol> {
        self.symbols.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Finish extraction: fills `children_ids` from the parent links.
    pub fn finish(mut self) -> Vec<Symbol> {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for symbol in &self.symbols {
            if let Some(parent) = &symbol.parent_id {
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(symbol.id.clone());
            }
        }

        for symbol in &mut self.symbols {
            if let Some(ids) = children.remove(&symbol.id) {
                symbol.children_ids = ids;
            }
        }

        self.symbols
    }
}
