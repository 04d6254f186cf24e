//! Java parser. Access modifiers map onto [`Visibility`] directly; members
//! without one are package-private (`Internal`), except inside interfaces
//! where they are implicitly public.

use super::{doc_comment, field_text, location, named_children, parse_tree, signature, text};
use crate::imports::{ImportInfo, ImportSpecifier};
use crate::language::Language;
use crate::registry::{LanguageParser, ParseOutput};
use crate::symbols::{Parameter, Symbol, SymbolKind, SymbolSink, Visibility};
use tree_sitter::Node;

pub struct JavaParser;

impl LanguageParser for JavaParser {
    fn language(&self) -> Language {
        Language::Java
    }

    fn parse(&self, content: &str, file_path: &str) -> ParseOutput {
        let Some(tree) = parse_tree(tree_sitter_java::LANGUAGE.into(), content, file_path) else {
            return ParseOutput::default();
        };
        let root = tree.root_node();

        let mut sink = SymbolSink::new(file_path);
        let mut imports = Vec::new();
        let mut module_doc = None;

        for node in named_children(root) {
            match node.kind() {
                "package_declaration" => module_doc = javadoc(node, content),
                "import_declaration" => imports.extend(import(node, content)),
                _ => type_declaration(node, content, &mut sink, None, true, false),
            }
        }

        ParseOutput {
            symbols: sink.finish(),
            imports,
            exports: Vec::new(),
            module_doc,
        }
    }
}

fn javadoc(node: Node, source: &str) -> Option<String> {
    doc_comment(node, source, &[], |c| c.starts_with("/**"))
}

fn modifiers_text<'a>(node: Node, source: &'a str) -> &'a str {
    named_children(node)
        .into_iter()
        .find(|c| c.kind() == "modifiers")
        .map(|m| text(m, source))
        .unwrap_or("")
}

fn has_modifier(modifiers: &str, keyword: &str) -> bool {
    modifiers.split_whitespace().any(|word| word == keyword)
}

fn visibility(node: Node, source: &str, in_interface: bool) -> Visibility {
    let modifiers = modifiers_text(node, source);
    if has_modifier(modifiers, "public") {
        Visibility::Public
    } else if has_modifier(modifiers, "private") {
        Visibility::Private
    } else if has_modifier(modifiers, "protected") {
        Visibility::Protected
    } else if in_interface {
        Visibility::Public
    } else {
        Visibility::Internal
    }
}

/// Class-like declarations: class, interface, enum, record, annotation.
/// `enclosing_exported` is false once any enclosing type is not public.
fn type_declaration(
    node: Node,
    source: &str,
    sink: &mut SymbolSink,
    parent: Option<&str>,
    enclosing_exported: bool,
    in_interface: bool,
) {
    let kind = match node.kind() {
        "class_declaration" | "record_declaration" => SymbolKind::Class,
        "interface_declaration" | "annotation_type_declaration" => SymbolKind::Interface,
        "enum_declaration" => SymbolKind::Enum,
        _ => return,
    };
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let visibility = visibility(node, source, in_interface);
    let exported = enclosing_exported && visibility == Visibility::Public;

    let mut symbol = Symbol::new(name, kind, location(node, sink.file_path()))
        .with_visibility(visibility)
        .with_exported(exported)
        .with_signature(signature(node, source))
        .with_doc(javadoc(node, source));

    if let Some(superclass) = node.child_by_field_name("superclass") {
        symbol.extends.extend(type_list(superclass, source));
    }
    if let Some(interfaces) = node.child_by_field_name("interfaces") {
        symbol.implements = type_list(interfaces, source);
    }
    for child in named_children(node) {
        if child.kind() == "extends_interfaces" {
            symbol.extends.extend(type_list(child, source));
        }
    }

    let id = sink.push(symbol, parent);

    if node.kind() == "record_declaration" {
        if let Some(params) = node.child_by_field_name("parameters") {
            for component in named_children(params) {
                let Some(component_name) = field_text(component, "name", source) else {
                    continue;
                };
                let mut field = Symbol::new(component_name, SymbolKind::Property, location(component, sink.file_path()))
                    .with_visibility(Visibility::Private)
                    .with_signature(signature(component, source));
                field.return_type = field_text(component, "type", source).map(str::to_string);
                sink.push(field, Some(id.as_str()));
            }
        }
    }

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let interface_body = kind == SymbolKind::Interface;
    members(body, source, sink, &id, exported, interface_body);
}

fn members(
    body: Node,
    source: &str,
    sink: &mut SymbolSink,
    owner_id: &str,
    owner_exported: bool,
    in_interface: bool,
) {
    for member in named_children(body) {
        match member.kind() {
            "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                method(member, source, sink, owner_id, in_interface);
            }
            "field_declaration" | "constant_declaration" => {
                fields(member, source, sink, owner_id, in_interface);
            }
            "enum_constant" => {
                if let Some(name) = field_text(member, "name", source) {
                    let symbol = Symbol::new(name, SymbolKind::Constant, location(member, sink.file_path()))
                        .with_signature(signature(member, source))
                        .with_doc(javadoc(member, source));
                    sink.push(symbol, Some(owner_id));
                }
            }
            // Members after the constants of an enum.
            "enum_body_declarations" => {
                members(member, source, sink, owner_id, owner_exported, in_interface);
            }
            _ => type_declaration(member, source, sink, Some(owner_id), owner_exported, in_interface),
        }
    }
}

fn method(node: Node, source: &str, sink: &mut SymbolSink, owner_id: &str, in_interface: bool) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let mut symbol = Symbol::new(name, SymbolKind::Method, location(node, sink.file_path()))
        .with_visibility(visibility(node, source, in_interface))
        .with_signature(signature(node, source))
        .with_doc(javadoc(node, source));
    if let Some(params) = node.child_by_field_name("parameters") {
        symbol.parameters = parameters(params, source);
    }
    // Constructors have no return type.
    symbol.return_type = field_text(node, "type", source).map(str::to_string);
    sink.push(symbol, Some(owner_id));
}

fn fields(node: Node, source: &str, sink: &mut SymbolSink, owner_id: &str, in_interface: bool) {
    let modifiers = modifiers_text(node, source);
    let constant = node.kind() == "constant_declaration"
        || in_interface
        || (has_modifier(modifiers, "static") && has_modifier(modifiers, "final"));
    let kind = if constant {
        SymbolKind::Constant
    } else {
        SymbolKind::Property
    };
    let field_type = field_text(node, "type", source).map(str::to_string);
    let visibility = visibility(node, source, in_interface);
    let doc = javadoc(node, source);

    for declarator in named_children(node) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name) = field_text(declarator, "name", source) else {
            continue;
        };
        let mut symbol = Symbol::new(name, kind, location(declarator, sink.file_path()))
            .with_visibility(visibility)
            .with_signature(signature(node, source))
            .with_doc(doc.clone());
        symbol.return_type = field_type.clone();
        sink.push(symbol, Some(owner_id));
    }
}

fn parameters(params: Node, source: &str) -> Vec<Parameter> {
    let mut result = Vec::new();
    for param in named_children(params) {
        match param.kind() {
            "formal_parameter" => {
                let Some(name) = field_text(param, "name", source) else {
                    continue;
                };
                result.push(Parameter {
                    type_annotation: field_text(param, "type", source).map(str::to_string),
                    ..Parameter::named(name)
                });
            }
            "spread_parameter" => {
                let children = named_children(param);
                let ty = children
                    .iter()
                    .find(|c| c.kind().ends_with("type") || c.kind() == "type_identifier")
                    .map(|c| format!("{}...", text(*c, source)));
                let name = children
                    .iter()
                    .find(|c| c.kind() == "variable_declarator")
                    .and_then(|d| field_text(*d, "name", source))
                    .unwrap_or("args");
                result.push(Parameter {
                    type_annotation: ty,
                    optional: true,
                    ..Parameter::named(name)
                });
            }
            _ => {}
        }
    }
    result
}

/// Types named by `extends X`, `implements A, B` or `extends A, B`.
fn type_list(node: Node, source: &str) -> Vec<String> {
    let mut types = Vec::new();
    for child in named_children(node) {
        if child.kind() == "type_list" {
            types.extend(named_children(child).into_iter().map(|t| text(t, source).to_string()));
        } else {
            types.push(text(child, source).to_string());
        }
    }
    types
}

fn import(node: Node, source: &str) -> Option<ImportInfo> {
    let path = named_children(node)
        .into_iter()
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))?;
    let path = text(path, source);
    let line = node.start_position().row + 1;

    let wildcard = named_children(node).iter().any(|c| c.kind() == "asterisk");
    if wildcard {
        let mut import = ImportInfo::new(path, line);
        import.specifiers.push(ImportSpecifier::namespace("*"));
        return Some(import);
    }

    let (package, name) = path.rsplit_once('.').unwrap_or(("", path));
    let mut import = ImportInfo::new(if package.is_empty() { path } else { package }, line);
    import.specifiers.push(ImportSpecifier::named(name));
    Some(import)
}
