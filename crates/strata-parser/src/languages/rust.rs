//! Rust parser.
//!
//! `pub` items are public, restricted visibility (`pub(crate)`, `pub(super)`,
//! `pub(in path)`) is internal, and everything else private. Methods from
//! `impl` blocks nest under their type when it is declared in the same file;
//! trait impls are recorded in the type's `implements`.
//!
//! Out-of-line `mod foo;` declarations are emitted as path imports
//! (`./foo`, or `./<stem>/foo` from a non-root file) so that the dependency
//! graph links a parent module to its children.

use super::{
    annotation, doc_comment, field_text, location, named_children, parse_tree, signature, text,
};
use crate::imports::{ExportInfo, ImportInfo, ImportSpecifier};
use crate::language::Language;
use crate::registry::{LanguageParser, ParseOutput};
use crate::symbols::{Parameter, Symbol, SymbolKind, SymbolSink, Visibility};
use std::path::Path;
use tree_sitter::Node;

pub struct RustParser;

impl LanguageParser for RustParser {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn parse(&self, content: &str, file_path: &str) -> ParseOutput {
        let Some(tree) = parse_tree(tree_sitter_rust::LANGUAGE.into(), content, file_path) else {
            return ParseOutput::default();
        };
        let root = tree.root_node();

        let mut walker = Walker {
            source: content,
            sink: SymbolSink::new(file_path),
            imports: Vec::new(),
            exports: Vec::new(),
            mod_dir: module_dir(file_path),
        };
        walker.items(root, None, &mut Vec::new(), true);

        ParseOutput {
            symbols: walker.sink.finish(),
            imports: walker.imports,
            exports: walker.exports,
            module_doc: inner_doc(root, content),
        }
    }
}

/// Directory (relative to the current file) that holds this file's child
/// modules: `.` for `lib.rs`/`main.rs`/`mod.rs`, `./<stem>` otherwise.
fn module_dir(file_path: &str) -> String {
    let path = Path::new(file_path);
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if matches!(file_name, "lib.rs" | "main.rs" | "mod.rs") {
        return ".".to_string();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    format!("./{}", stem)
}

struct Walker<'s> {
    source: &'s str,
    sink: SymbolSink,
    imports: Vec<ImportInfo>,
    exports: Vec<ExportInfo>,
    mod_dir: String,
}

impl<'s> Walker<'s> {
    /// Walk one item list. `mod_path` holds the names of enclosing inline
    /// modules; `exported` is false once any enclosing module is non-`pub`.
    fn items(&mut self, list: Node, parent: Option<&str>, mod_path: &mut Vec<String>, exported: bool) {
        let items = named_children(list);

        // impls last so their methods find types declared later in the file.
        for item in items.iter().filter(|i| i.kind() != "impl_item") {
            self.item(*item, parent, mod_path, exported);
        }
        for item in items.iter().filter(|i| i.kind() == "impl_item") {
            self.impl_block(*item, parent);
        }
    }

    fn item(&mut self, item: Node, parent: Option<&str>, mod_path: &mut Vec<String>, exported: bool) {
        let kind = match item.kind() {
            "function_item" | "function_signature_item" => SymbolKind::Function,
            "struct_item" | "union_item" => SymbolKind::Class,
            "enum_item" => SymbolKind::Enum,
            "trait_item" => SymbolKind::Interface,
            "type_item" => SymbolKind::Type,
            "const_item" => SymbolKind::Constant,
            "static_item" => SymbolKind::Variable,
            "macro_definition" => SymbolKind::Function,
            "mod_item" => SymbolKind::Module,
            "use_declaration" => {
                self.use_declaration(item, mod_path);
                return;
            }
            _ => return,
        };

        let Some(name) = field_text(item, "name", self.source) else {
            return;
        };
        let visibility = if item.kind() == "macro_definition" {
            macro_visibility(item, self.source)
        } else {
            visibility(item, self.source)
        };

        let mut symbol = Symbol::new(name, kind, location(item, self.sink.file_path()))
            .with_visibility(visibility)
            .with_exported(exported && visibility == Visibility::Public)
            .with_signature(signature(item, self.source))
            .with_doc(outer_doc(item, self.source));

        match item.kind() {
            "function_item" | "function_signature_item" => self.callable_details(item, &mut symbol),
            "const_item" | "static_item" => {
                symbol.return_type = field_text(item, "type", self.source).map(str::to_string);
            }
            "trait_item" => {
                if let Some(bounds) = item.child_by_field_name("bounds") {
                    symbol.extends = named_children(bounds)
                        .into_iter()
                        .map(|b| text(b, self.source).to_string())
                        .collect();
                }
            }
            _ => {}
        }

        let id = self.sink.push(symbol, parent);
        let body = item.child_by_field_name("body");

        match item.kind() {
            "struct_item" | "union_item" => {
                if let Some(body) = body {
                    self.fields(body, &id);
                }
            }
            "enum_item" => {
                if let Some(body) = body {
                    self.variants(body, &id);
                }
            }
            "trait_item" => {
                if let Some(body) = body {
                    self.trait_members(body, &id);
                }
            }
            "mod_item" => match body {
                Some(body) => {
                    mod_path.push(name.to_string());
                    let child_exported = exported && visibility == Visibility::Public;
                    self.items(body, Some(id.as_str()), mod_path, child_exported);
                    mod_path.pop();
                }
                None => {
                    let mut segments = vec![self.mod_dir.clone()];
                    segments.extend(mod_path.iter().cloned());
                    segments.push(name.to_string());
                    let mut import =
                        ImportInfo::new(segments.join("/"), item.start_position().row + 1);
                    import.specifiers.push(ImportSpecifier::namespace(name));
                    self.imports.push(import);
                }
            },
            _ => {}
        }
    }

    fn callable_details(&self, item: Node, symbol: &mut Symbol) {
        if let Some(params) = item.child_by_field_name("parameters") {
            symbol.parameters = parameters(params, self.source);
        }
        symbol.return_type = field_text(item, "return_type", self.source).map(annotation);
    }

    fn fields(&mut self, body: Node, struct_id: &str) {
        let tuple = body.kind() == "ordered_field_declaration_list";
        let mut position = 0;
        for field in named_children(body) {
            let name = if tuple {
                // Tuple struct fields are positional; only the types are named nodes.
                if matches!(
                    field.kind(),
                    "visibility_modifier" | "attribute_item" | "line_comment" | "block_comment"
                ) {
                    continue;
                }
                position += 1;
                (position - 1).to_string()
            } else if field.kind() == "field_declaration" {
                match field_text(field, "name", self.source) {
                    Some(name) => name.to_string(),
                    None => continue,
                }
            } else {
                continue;
            };
            let mut symbol = Symbol::new(name, SymbolKind::Property, location(field, self.sink.file_path()))
                .with_visibility(visibility(field, self.source))
                .with_signature(signature(field, self.source))
                .with_doc(outer_doc(field, self.source));
            symbol.return_type = field_text(field, "type", self.source).map(str::to_string);
            self.sink.push(symbol, Some(struct_id));
        }
    }

    fn variants(&mut self, body: Node, enum_id: &str) {
        for variant in named_children(body) {
            if variant.kind() != "enum_variant" {
                continue;
            }
            let Some(name) = field_text(variant, "name", self.source) else {
                continue;
            };
            let symbol = Symbol::new(name, SymbolKind::Constant, location(variant, self.sink.file_path()))
                .with_signature(signature(variant, self.source))
                .with_doc(outer_doc(variant, self.source));
            self.sink.push(symbol, Some(enum_id));
        }
    }

    fn trait_members(&mut self, body: Node, trait_id: &str) {
        for member in named_children(body) {
            let kind = match member.kind() {
                "function_item" | "function_signature_item" => SymbolKind::Method,
                "associated_type" => SymbolKind::Type,
                "const_item" => SymbolKind::Constant,
                _ => continue,
            };
            let Some(name) = field_text(member, "name", self.source) else {
                continue;
            };
            let mut symbol = Symbol::new(name, kind, location(member, self.sink.file_path()))
                .with_signature(signature(member, self.source))
                .with_doc(outer_doc(member, self.source));
            if kind == SymbolKind::Method {
                self.callable_details(member, &mut symbol);
            }
            self.sink.push(symbol, Some(trait_id));
        }
    }

    fn impl_block(&mut self, item: Node, parent: Option<&str>) {
        let Some(self_type) = field_text(item, "type", self.source).map(base_type_name) else {
            return;
        };
        let trait_name = field_text(item, "trait", self.source).map(base_type_name);

        let owner = self
            .sink
            .find_top_level(&self_type)
            .filter(|s| s.parent_id.as_deref() == parent)
            .map(|s| s.id.clone())
            // Inside inline modules the owner is nested, not top-level.
            .or_else(|| parent.map(|prefix| format!("{}.{}", prefix, self_type)));
        let owner = owner.filter(|id| self.sink.contains(id));

        if let (Some(owner_id), Some(trait_name)) = (&owner, &trait_name) {
            if let Some(owner) = self.sink.get_mut(owner_id) {
                if !owner.implements.contains(trait_name) {
                    owner.implements.push(trait_name.clone());
                }
            }
        }

        let Some(body) = item.child_by_field_name("body") else {
            return;
        };
        for member in named_children(body) {
            if member.kind() != "function_item" {
                continue;
            }
            let Some(name) = field_text(member, "name", self.source) else {
                continue;
            };
            // Trait methods carry the trait's visibility.
            let visibility = if trait_name.is_some() {
                Visibility::Public
            } else {
                visibility(member, self.source)
            };
            let kind = if owner.is_some() {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            let mut symbol = Symbol::new(name, kind, location(member, self.sink.file_path()))
                .with_visibility(visibility)
                .with_signature(signature(member, self.source))
                .with_doc(outer_doc(member, self.source));
            self.callable_details(member, &mut symbol);
            self.sink.push(symbol, owner.as_deref().or(parent));
        }
    }

    fn use_declaration(&mut self, item: Node, mod_path: &[String]) {
        let Some(argument) = item.child_by_field_name("argument") else {
            return;
        };
        let line = item.start_position().row + 1;
        let (source, specifiers) = use_tree(argument, self.source);
        let mut import = ImportInfo::new(source.clone(), line);
        import.specifiers = specifiers.clone();
        self.imports.push(import);

        if mod_path.is_empty() && visibility(item, self.source) == Visibility::Public {
            self.exports.push(ExportInfo {
                source: Some(source),
                specifiers,
                type_only: false,
                line,
            });
        }
    }
}

/// Split a use tree into its path and the names it binds.
fn use_tree(node: Node, source: &str) -> (String, Vec<ImportSpecifier>) {
    match node.kind() {
        "scoped_identifier" => {
            let path = field_text(node, "path", source).unwrap_or_default();
            let name = field_text(node, "name", source).unwrap_or_default();
            (path.to_string(), vec![ImportSpecifier::named(name)])
        }
        "use_as_clause" => {
            let full = node.child_by_field_name("path");
            let alias = field_text(node, "alias", source).map(str::to_string);
            let (path, mut specs) = full
                .map(|p| use_tree(p, source))
                .unwrap_or_default();
            if let Some(spec) = specs.first_mut() {
                spec.alias = alias;
            }
            (path, specs)
        }
        "scoped_use_list" => {
            let path = field_text(node, "path", source).unwrap_or_default().to_string();
            let specs = node
                .child_by_field_name("list")
                .map(|list| use_list(list, source))
                .unwrap_or_default();
            (path, specs)
        }
        "use_wildcard" => {
            let path = named_children(node)
                .into_iter()
                .next()
                .map(|p| text(p, source).to_string())
                .unwrap_or_default();
            (path, vec![ImportSpecifier::namespace("*")])
        }
        "use_list" => (String::new(), use_list(node, source)),
        _ => {
            let name = text(node, source).to_string();
            (name.clone(), vec![ImportSpecifier::named(name)])
        }
    }
}

fn use_list(list: Node, source: &str) -> Vec<ImportSpecifier> {
    named_children(list)
        .into_iter()
        .flat_map(|entry| match entry.kind() {
            "identifier" | "self" | "crate" | "super" => {
                vec![ImportSpecifier::named(text(entry, source))]
            }
            _ => use_tree(entry, source).1,
        })
        .collect()
}

/// `Foo<T>` → `Foo`, `crate::a::Foo` → `Foo`, `&mut Foo` → `Foo`.
fn base_type_name(raw: &str) -> String {
    let raw = raw.trim_start_matches('&').trim_start_matches("mut ").trim();
    let raw = raw.split('<').next().unwrap_or(raw);
    raw.rsplit("::").next().unwrap_or(raw).trim().to_string()
}

fn visibility(item: Node, source: &str) -> Visibility {
    let modifier = named_children(item)
        .into_iter()
        .find(|c| c.kind() == "visibility_modifier");
    match modifier.map(|m| text(m, source).trim()) {
        Some("pub") => Visibility::Public,
        Some(_) => Visibility::Internal,
        None => Visibility::Private,
    }
}

/// `macro_rules!` has no visibility modifier; `#[macro_export]` makes it public.
fn macro_visibility(item: Node, source: &str) -> Visibility {
    let mut prev = item.prev_sibling();
    while let Some(node) = prev {
        match node.kind() {
            "attribute_item" if text(node, source).contains("macro_export") => {
                return Visibility::Public;
            }
            "attribute_item" | "line_comment" | "block_comment" => prev = node.prev_sibling(),
            _ => break,
        }
    }
    Visibility::Private
}

fn outer_doc(item: Node, source: &str) -> Option<String> {
    doc_comment(item, source, &["attribute_item"], |c| {
        (c.starts_with("///") && !c.starts_with("////")) || c.starts_with("/**")
    })
}

/// Leading `//!` / `/*! */` comments of the file.
fn inner_doc(root: Node, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    for child in named_children(root) {
        let raw = text(child, source);
        if !child.kind().contains("comment") {
            break;
        }
        if raw.starts_with("//!") || raw.starts_with("/*!") {
            lines.push(super::clean_comment(raw));
        } else if !lines.is_empty() {
            break;
        }
    }
    let doc = lines.join("\n").trim().to_string();
    (!doc.is_empty()).then_some(doc)
}

fn parameters(params: Node, source: &str) -> Vec<Parameter> {
    named_children(params)
        .into_iter()
        .filter_map(|param| match param.kind() {
            "parameter" => Some(Parameter {
                type_annotation: field_text(param, "type", source).map(str::to_string),
                ..Parameter::named(field_text(param, "pattern", source).unwrap_or("_"))
            }),
            "variadic_parameter" => Some(Parameter {
                optional: true,
                ..Parameter::named("...")
            }),
            _ => None,
        })
        .collect()
}
