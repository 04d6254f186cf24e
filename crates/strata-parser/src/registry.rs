//! Parser registry: maps a [`Language`] to the parser that extracts its
//! symbols, imports and exports.

use crate::imports::{ExportInfo, ImportInfo};
use crate::language::Language;
use crate::languages;
use crate::symbols::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a parser extracts from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutput {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
    pub module_doc: Option<String>,
}

/// Per-language symbol extraction.
///
/// Implementations never fail: syntactically invalid input yields whatever
/// could be recovered from the error-tolerant tree, or an empty output.
/// Language policy (what counts as private, which names are exported) lives
/// entirely inside the implementation.
pub trait LanguageParser: Send + Sync {
    fn language(&self) -> Language;

    fn parse(&self, content: &str, file_path: &str) -> ParseOutput;
}

#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<Language, Arc<dyn LanguageParser>>,
}

impl ParserRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in parser registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for parser in languages::builtin_parsers() {
            registry.register(parser.language(), parser);
        }
        registry
    }

    /// Add or replace the parser for `language`.
    pub fn register(&mut self, language: Language, parser: Arc<dyn LanguageParser>) {
        if self.parsers.insert(language, parser).is_some() {
            tracing::debug!("Replaced parser for {}", language);
        }
    }

    pub fn get(&self, language: Language) -> Option<Arc<dyn LanguageParser>> {
        self.parsers.get(&language).cloned()
    }

    pub fn supports(&self, language: Language) -> bool {
        self.parsers.contains_key(&language)
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.parsers.keys().copied().collect();
        languages.sort();
        languages
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}
