//! Language detection and per-language symbol/import extraction.

pub mod imports;
pub mod language;
pub mod languages;
pub mod registry;
pub mod symbols;

pub use imports::{ExportInfo, ImportInfo, ImportSpecifier};
pub use language::{Language, detect};
pub use registry::{LanguageParser, ParseOutput, ParserRegistry};
pub use symbols::{Parameter, SourceLocation, Symbol, SymbolKind, SymbolSink, Visibility};
