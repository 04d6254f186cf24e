//! TypeScript and JavaScript parser.
//!
//! One implementation serves both languages: the JavaScript grammar is used
//! for `.js`/`.jsx`/`.mjs`/`.cjs`, the TSX grammar for `.tsx` and the plain
//! TypeScript grammar for everything else. Top-level declarations that are
//! not exported are `Internal`; class members are `Public` unless marked
//! `private`/`protected` or named with a `#`.

use super::{
    annotation, children_by_field, doc_comment, field_text, has_token, location, named_children,
    parse_tree, signature, text, unquote,
};
use crate::imports::{ExportInfo, ImportInfo, ImportSpecifier};
use crate::language::Language;
use crate::registry::{LanguageParser, ParseOutput};
use crate::symbols::{Parameter, Symbol, SymbolKind, SymbolSink, Visibility};
use std::collections::HashSet;
use tree_sitter::Node;

pub struct TypeScriptParser {
    language: Language,
}

impl TypeScriptParser {
    pub fn typescript() -> Self {
        Self {
            language: Language::TypeScript,
        }
    }

    pub fn javascript() -> Self {
        Self {
            language: Language::JavaScript,
        }
    }

    fn grammar(&self, file_path: &str) -> tree_sitter::Language {
        match self.language {
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            _ if file_path.to_lowercase().ends_with(".tsx") => {
                tree_sitter_typescript::LANGUAGE_TSX.into()
            }
            _ => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

impl LanguageParser for TypeScriptParser {
    fn language(&self) -> Language {
        self.language
    }

    fn parse(&self, content: &str, file_path: &str) -> ParseOutput {
        let Some(tree) = parse_tree(self.grammar(file_path), content, file_path) else {
            return ParseOutput::default();
        };
        let root = tree.root_node();

        let mut walker = Walker {
            source: content,
            sink: SymbolSink::new(file_path),
            imports: Vec::new(),
            exports: Vec::new(),
            exported_names: HashSet::new(),
        };

        for child in named_children(root) {
            walker.statement(child, false, child, None);
        }

        let Walker {
            sink,
            imports,
            exports,
            exported_names,
            ..
        } = walker;

        let mut sink = sink;
        for symbol in sink.iter_mut() {
            if symbol.parent_id.is_none() && exported_names.contains(&symbol.name) {
                symbol.exported = true;
                symbol.visibility = Visibility::Public;
            }
        }

        ParseOutput {
            symbols: sink.finish(),
            imports,
            exports,
            module_doc: module_doc(root, content),
        }
    }
}

struct Walker<'s> {
    source: &'s str,
    sink: SymbolSink,
    imports: Vec<ImportInfo>,
    exports: Vec<ExportInfo>,
    /// Names exported via `export { a }` or `export default a`.
    exported_names: HashSet<String>,
}

impl<'s> Walker<'s> {
    /// Handle one statement. `anchor` is the node a doc comment would sit
    /// above (the enclosing `export` statement for exported declarations).
    fn statement(&mut self, node: Node, exported: bool, anchor: Node, parent: Option<&str>) {
        match node.kind() {
            "import_statement" => self.import(node),
            "export_statement" => self.export(node, parent),
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                self.function(node, exported, anchor, parent);
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                self.class(node, exported, anchor, parent);
            }
            "interface_declaration" => self.interface(node, exported, anchor, parent),
            "type_alias_declaration" => {
                self.simple(node, SymbolKind::Type, exported, anchor, parent);
            }
            "enum_declaration" => self.simple(node, SymbolKind::Enum, exported, anchor, parent),
            "lexical_declaration" | "variable_declaration" => {
                self.variables(node, exported, anchor, parent);
            }
            "internal_module" | "module" => self.namespace(node, exported, anchor, parent),
            "ambient_declaration" => {
                for child in named_children(node) {
                    self.statement(child, exported, anchor, parent);
                }
            }
            "expression_statement" => {
                for child in named_children(node) {
                    match child.kind() {
                        "internal_module" => self.namespace(child, exported, anchor, parent),
                        "call_expression" => {
                            if let Some(source) = require_source(child, self.source) {
                                let line = child.start_position().row + 1;
                                self.imports.push(ImportInfo::new(source, line));
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn top_level_visibility(exported: bool) -> Visibility {
        if exported {
            Visibility::Public
        } else {
            Visibility::Internal
        }
    }

    fn jsdoc(&self, anchor: Node) -> Option<String> {
        doc_comment(anchor, self.source, &["decorator"], |c| c.starts_with("/**"))
    }

    fn declared_name(&self, node: Node) -> Option<String> {
        field_text(node, "name", self.source).map(str::to_string)
    }

    fn function(&mut self, node: Node, exported: bool, anchor: Node, parent: Option<&str>) {
        let name = self.declared_name(node).unwrap_or_else(|| "default".to_string());
        let mut symbol = Symbol::new(name, SymbolKind::Function, location(node, self.sink.file_path()))
            .with_visibility(Self::top_level_visibility(exported))
            .with_exported(exported)
            .with_signature(signature(node, self.source))
            .with_doc(self.jsdoc(anchor));
        self.callable_details(node, &mut symbol);
        self.sink.push(symbol, parent);
    }

    fn callable_details(&self, node: Node, symbol: &mut Symbol) {
        if let Some(params) = node.child_by_field_name("parameters") {
            symbol.parameters = parameters(params, self.source);
        } else if let Some(param) = node.child_by_field_name("parameter") {
            symbol.parameters = vec![Parameter::named(text(param, self.source))];
        }
        symbol.return_type = field_text(node, "return_type", self.source).map(annotation);
    }

    fn class(&mut self, node: Node, exported: bool, anchor: Node, parent: Option<&str>) {
        let name = self.declared_name(node).unwrap_or_else(|| "default".to_string());
        let mut symbol = Symbol::new(name, SymbolKind::Class, location(node, self.sink.file_path()))
            .with_visibility(Self::top_level_visibility(exported))
            .with_exported(exported)
            .with_signature(signature(node, self.source))
            .with_doc(self.jsdoc(anchor));

        for child in named_children(node) {
            if child.kind() == "class_heritage" {
                self.heritage(child, &mut symbol);
            }
        }

        let class_id = self.sink.push(symbol, parent);

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        for member in named_children(body) {
            self.class_member(member, &class_id);
        }
    }

    fn heritage(&self, heritage: Node, symbol: &mut Symbol) {
        for clause in named_children(heritage) {
            match clause.kind() {
                "extends_clause" => {
                    for value in children_by_field(clause, "value") {
                        symbol.extends.push(text(value, self.source).to_string());
                    }
                }
                "implements_clause" => {
                    for ty in named_children(clause) {
                        symbol.implements.push(text(ty, self.source).to_string());
                    }
                }
                // JavaScript: `class A extends B` has the expression directly.
                _ => symbol.extends.push(text(clause, self.source).to_string()),
            }
        }
    }

    fn class_member(&mut self, member: Node, class_id: &str) {
        let (kind, name_field) = match member.kind() {
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                (SymbolKind::Method, "name")
            }
            "public_field_definition" => (SymbolKind::Property, "name"),
            "field_definition" => (SymbolKind::Property, "property"),
            _ => return,
        };
        let Some(name_node) = member.child_by_field_name(name_field) else {
            return;
        };
        let name = text(name_node, self.source).to_string();

        let mut visibility = Visibility::Public;
        if name.starts_with('#') {
            visibility = Visibility::Private;
        }
        for child in named_children(member) {
            if child.kind() == "accessibility_modifier" {
                visibility = match text(child, self.source) {
                    "private" => Visibility::Private,
                    "protected" => Visibility::Protected,
                    _ => Visibility::Public,
                };
            }
        }

        let mut symbol = Symbol::new(name, kind, location(member, self.sink.file_path()))
            .with_visibility(visibility)
            .with_signature(signature(member, self.source))
            .with_doc(self.jsdoc(member));

        if kind == SymbolKind::Method {
            self.callable_details(member, &mut symbol);
        } else if let Some(value) = member.child_by_field_name("value") {
            if is_function_value(value) {
                symbol.kind = SymbolKind::Method;
                self.callable_details(value, &mut symbol);
            }
        }

        self.sink.push(symbol, Some(class_id));
    }

    fn interface(&mut self, node: Node, exported: bool, anchor: Node, parent: Option<&str>) {
        let Some(name) = self.declared_name(node) else {
            return;
        };
        let mut symbol = Symbol::new(name, SymbolKind::Interface, location(node, self.sink.file_path()))
            .with_visibility(Self::top_level_visibility(exported))
            .with_exported(exported)
            .with_signature(signature(node, self.source))
            .with_doc(self.jsdoc(anchor));

        for child in named_children(node) {
            if child.kind() == "extends_type_clause" {
                for ty in named_children(child) {
                    symbol.extends.push(text(ty, self.source).to_string());
                }
            }
        }

        let interface_id = self.sink.push(symbol, parent);

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        for member in named_children(body) {
            let kind = match member.kind() {
                "property_signature" => SymbolKind::Property,
                "method_signature" => SymbolKind::Method,
                _ => continue,
            };
            let Some(name) = field_text(member, "name", self.source) else {
                continue;
            };
            let mut symbol = Symbol::new(name, kind, location(member, self.sink.file_path()))
                .with_signature(signature(member, self.source))
                .with_doc(self.jsdoc(member));
            if kind == SymbolKind::Method {
                self.callable_details(member, &mut symbol);
            } else {
                symbol.return_type = field_text(member, "type", self.source).map(annotation);
            }
            self.sink.push(symbol, Some(interface_id.as_str()));
        }
    }

    fn simple(&mut self, node: Node, kind: SymbolKind, exported: bool, anchor: Node, parent: Option<&str>) {
        let Some(name) = self.declared_name(node) else {
            return;
        };
        let symbol = Symbol::new(name, kind, location(node, self.sink.file_path()))
            .with_visibility(Self::top_level_visibility(exported))
            .with_exported(exported)
            .with_signature(signature(node, self.source))
            .with_doc(self.jsdoc(anchor));
        self.sink.push(symbol, parent);
    }

    fn variables(&mut self, node: Node, exported: bool, anchor: Node, parent: Option<&str>) {
        let is_const = field_text(node, "kind", self.source) == Some("const");

        for declarator in named_children(node) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let value = declarator.child_by_field_name("value");

            if let Some(source) = value.and_then(|v| require_source(v, self.source)) {
                let mut import = ImportInfo::new(source, declarator.start_position().row + 1);
                if name_node.kind() == "identifier" {
                    import
                        .specifiers
                        .push(ImportSpecifier::default_import(text(name_node, self.source)));
                }
                self.imports.push(import);
                continue;
            }

            // Destructuring patterns do not declare a single named symbol.
            if name_node.kind() != "identifier" {
                continue;
            }

            let kind = match value {
                Some(v) if is_function_value(v) => SymbolKind::Function,
                _ if is_const => SymbolKind::Constant,
                _ => SymbolKind::Variable,
            };

            let mut symbol = Symbol::new(
                text(name_node, self.source),
                kind,
                location(declarator, self.sink.file_path()),
            )
            .with_visibility(Self::top_level_visibility(exported))
            .with_exported(exported)
            .with_signature(signature(node, self.source))
            .with_doc(self.jsdoc(anchor));

            if let Some(v) = value.filter(|v| is_function_value(*v)) {
                self.callable_details(v, &mut symbol);
            }

            self.sink.push(symbol, parent);
        }
    }

    fn namespace(&mut self, node: Node, exported: bool, anchor: Node, parent: Option<&str>) {
        let Some(name) = self.declared_name(node) else {
            return;
        };
        let symbol = Symbol::new(unquote(&name), SymbolKind::Namespace, location(node, self.sink.file_path()))
            .with_visibility(Self::top_level_visibility(exported))
            .with_exported(exported)
            .with_signature(signature(node, self.source))
            .with_doc(self.jsdoc(anchor));
        let namespace_id = self.sink.push(symbol, parent);

        if let Some(body) = node.child_by_field_name("body") {
            for child in named_children(body) {
                self.statement(child, false, child, Some(namespace_id.as_str()));
            }
        }
    }

    fn import(&mut self, node: Node) {
        let Some(source) = field_text(node, "source", self.source).map(unquote) else {
            return;
        };
        let mut import = ImportInfo::new(source, node.start_position().row + 1);
        import.type_only = has_token(node, "type");

        for clause in named_children(node) {
            if clause.kind() != "import_clause" {
                continue;
            }
            for part in named_children(clause) {
                match part.kind() {
                    "identifier" => import
                        .specifiers
                        .push(ImportSpecifier::default_import(text(part, self.source))),
                    "namespace_import" => {
                        if let Some(local) = named_children(part).into_iter().next() {
                            import
                                .specifiers
                                .push(ImportSpecifier::namespace(text(local, self.source)));
                        }
                    }
                    "named_imports" => {
                        for spec in named_children(part) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            if let Some(name) = field_text(spec, "name", self.source) {
                                let alias =
                                    field_text(spec, "alias", self.source).map(str::to_string);
                                import.specifiers.push(ImportSpecifier::aliased(name, alias));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        self.imports.push(import);
    }

    fn export(&mut self, node: Node, parent: Option<&str>) {
        let line = node.start_position().row + 1;
        let is_default = has_token(node, "default");
        let type_only = has_token(node, "type");

        if let Some(declaration) = node.child_by_field_name("declaration") {
            let before = self.sink.len();
            self.statement(declaration, true, node, parent);
            let names = self.declared_names_since(before);
            let specifiers = names
                .into_iter()
                .map(|name| {
                    if is_default {
                        ImportSpecifier {
                            alias: Some("default".to_string()),
                            is_default: true,
                            ..ImportSpecifier::named(name)
                        }
                    } else {
                        ImportSpecifier::named(name)
                    }
                })
                .collect();
            self.exports.push(ExportInfo::local(specifiers, line));
            return;
        }

        if let Some(source) = field_text(node, "source", self.source).map(unquote) {
            // Re-exports are dependencies too: `index.ts` barrels must link
            // importers to the modules they forward.
            let specifiers = self.export_specifiers(node);
            let mut import = ImportInfo::new(source.clone(), line);
            import.type_only = type_only;
            import.specifiers = specifiers.clone();
            self.imports.push(import);
            self.exports.push(ExportInfo {
                source: Some(source),
                specifiers,
                type_only,
                line,
            });
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            let local = if value.kind() == "identifier" {
                text(value, self.source).to_string()
            } else {
                let kind = if value.kind() == "class" {
                    SymbolKind::Class
                } else if is_function_value(value) {
                    SymbolKind::Function
                } else {
                    SymbolKind::Variable
                };
                let mut symbol = Symbol::new("default", kind, location(value, self.sink.file_path()))
                    .with_exported(true)
                    .with_signature(signature(node, self.source))
                    .with_doc(self.jsdoc(node));
                if kind == SymbolKind::Function {
                    self.callable_details(value, &mut symbol);
                }
                self.sink.push(symbol, parent);
                "default".to_string()
            };
            self.exported_names.insert(local.clone());
            self.exports.push(ExportInfo::local(
                vec![ImportSpecifier {
                    alias: Some("default".to_string()),
                    is_default,
                    ..ImportSpecifier::named(local)
                }],
                line,
            ));
            return;
        }

        let specifiers = self.export_specifiers(node);
        if specifiers.is_empty() {
            return;
        }
        for spec in &specifiers {
            self.exported_names.insert(spec.name.clone());
        }
        self.exports.push(ExportInfo {
            source: None,
            specifiers,
            type_only,
            line,
        });
    }

    fn export_specifiers(&self, node: Node) -> Vec<ImportSpecifier> {
        let mut specifiers = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "export_clause" => {
                    for spec in named_children(child) {
                        if spec.kind() != "export_specifier" {
                            continue;
                        }
                        if let Some(name) = field_text(spec, "name", self.source) {
                            let alias = field_text(spec, "alias", self.source).map(str::to_string);
                            specifiers.push(ImportSpecifier::aliased(unquote(name), alias));
                        }
                    }
                }
                "namespace_export" => {
                    if let Some(local) = named_children(child).into_iter().next() {
                        specifiers.push(ImportSpecifier::namespace(text(local, self.source)));
                    }
                }
                _ => {}
            }
        }
        if specifiers.is_empty() && has_token(node, "*") {
            specifiers.push(ImportSpecifier {
                alias: None,
                ..ImportSpecifier::namespace("*")
            });
        }
        specifiers
    }

    /// Top-level names pushed since the sink held `before` symbols.
    fn declared_names_since(&mut self, before: usize) -> Vec<String> {
        self.sink
            .iter_mut()
            .skip(before)
            .filter(|s| s.parent_id.is_none())
            .map(|s| s.name.clone())
            .collect()
    }
}

fn is_function_value(node: Node) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// `require("./x")` → `./x`.
fn require_source(node: Node, source: &str) -> Option<String> {
    if node.kind() != "call_expression" {
        return None;
    }
    let function = node.child_by_field_name("function")?;
    if text(function, source) != "require" {
        return None;
    }
    let arguments = node.child_by_field_name("arguments")?;
    let first = named_children(arguments).into_iter().next()?;
    (first.kind() == "string").then(|| unquote(text(first, source)))
}

fn parameters(params: Node, source: &str) -> Vec<Parameter> {
    let mut result = Vec::new();
    for param in named_children(params) {
        match param.kind() {
            "required_parameter" | "optional_parameter" => {
                let name = field_text(param, "pattern", source)
                    .unwrap_or_else(|| text(param, source));
                result.push(Parameter {
                    name: name.to_string(),
                    type_annotation: field_text(param, "type", source).map(annotation),
                    default_value: field_text(param, "value", source).map(str::to_string),
                    optional: param.kind() == "optional_parameter",
                });
            }
            "assignment_pattern" => {
                let name = field_text(param, "left", source).unwrap_or_default();
                result.push(Parameter {
                    default_value: field_text(param, "right", source).map(str::to_string),
                    optional: true,
                    ..Parameter::named(name)
                });
            }
            "identifier" | "rest_pattern" | "object_pattern" | "array_pattern" => {
                result.push(Parameter::named(text(param, source)));
            }
            _ => {}
        }
    }
    result
}

/// A leading `/** … */` block that documents the file rather than the
/// first declaration: it carries `@file`/`@module`/`@fileoverview`, or a
/// blank line separates it from what follows.
fn module_doc(root: Node, source: &str) -> Option<String> {
    let first = named_children(root).into_iter().next()?;
    if first.kind() != "comment" {
        return None;
    }
    let raw = text(first, source);
    if !raw.starts_with("/**") {
        return None;
    }

    let tagged = ["@file", "@module", "@fileoverview"]
        .iter()
        .any(|tag| raw.contains(tag));
    let detached = match first.next_sibling() {
        Some(next) => next.start_position().row > first.end_position().row + 1,
        None => true,
    };

    (tagged || detached).then(|| super::clean_comment(raw))
}
