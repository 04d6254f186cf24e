//! Go parser. Capitalised identifiers are exported; everything else is
//! package-internal. Methods attach to their receiver type when the type is
//! declared in the same file.

use super::{
    annotation, children_by_field, doc_comment, field_text, location, named_children, parse_tree,
    signature, text, unquote,
};
use crate::imports::{ImportInfo, ImportSpecifier};
use crate::language::Language;
use crate::registry::{LanguageParser, ParseOutput};
use crate::symbols::{Parameter, Symbol, SymbolKind, SymbolSink, Visibility};
use tree_sitter::Node;

pub struct GoParser;

impl LanguageParser for GoParser {
    fn language(&self) -> Language {
        Language::Go
    }

    fn parse(&self, content: &str, file_path: &str) -> ParseOutput {
        let Some(tree) = parse_tree(tree_sitter_go::LANGUAGE.into(), content, file_path) else {
            return ParseOutput::default();
        };
        let root = tree.root_node();
        let top_level = named_children(root);

        let mut sink = SymbolSink::new(file_path);
        let mut imports = Vec::new();
        let mut module_doc = None;

        // Types first so methods declared above their receiver still nest.
        for node in &top_level {
            if node.kind() == "type_declaration" {
                type_declaration(*node, content, &mut sink);
            }
        }

        for node in &top_level {
            match node.kind() {
                "package_clause" => module_doc = go_doc(*node, content),
                "import_declaration" => imports.extend(import_declaration(*node, content)),
                "function_declaration" => function(*node, content, &mut sink),
                "method_declaration" => method(*node, content, &mut sink),
                "const_declaration" | "var_declaration" => values(*node, content, &mut sink),
                _ => {}
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

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn visibility(name: &str) -> Visibility {
    if is_exported(name) {
        Visibility::Public
    } else {
        Visibility::Internal
    }
}

fn go_doc(node: Node, source: &str) -> Option<String> {
    doc_comment(node, source, &[], |c| c.starts_with("//") || c.starts_with("/*"))
}

fn declared(name: &str, kind: SymbolKind, node: Node, doc_anchor: Node, source: &str, file: &str) -> Symbol {
    Symbol::new(name, kind, location(node, file))
        .with_visibility(visibility(name))
        .with_exported(is_exported(name))
        .with_signature(signature(node, source))
        .with_doc(go_doc(doc_anchor, source))
}

fn type_declaration(decl: Node, source: &str, sink: &mut SymbolSink) {
    let specs = named_children(decl);
    let grouped = specs.len() > 1;

    for spec in specs {
        if !matches!(spec.kind(), "type_spec" | "type_alias") {
            continue;
        }
        let Some(name) = field_text(spec, "name", source) else {
            continue;
        };
        let ty = spec.child_by_field_name("type");
        let kind = match ty.map(|t| t.kind()) {
            Some("struct_type") => SymbolKind::Class,
            Some("interface_type") => SymbolKind::Interface,
            _ => SymbolKind::Type,
        };
        let anchor = if grouped { spec } else { decl };
        let symbol = declared(name, kind, spec, anchor, source, sink.file_path());
        let id = sink.push(symbol, None);

        if let Some(ty) = ty {
            match ty.kind() {
                "struct_type" => struct_fields(ty, &id, source, sink),
                "interface_type" => interface_methods(ty, &id, source, sink),
                _ => {}
            }
        }
    }
}

fn struct_fields(ty: Node, struct_id: &str, source: &str, sink: &mut SymbolSink) {
    let Some(list) = named_children(ty)
        .into_iter()
        .find(|c| c.kind() == "field_declaration_list")
    else {
        return;
    };

    let mut embedded = Vec::new();
    for field in named_children(list) {
        if field.kind() != "field_declaration" {
            continue;
        }
        let names = children_by_field(field, "name");
        let field_type = field_text(field, "type", source).map(str::to_string);

        if names.is_empty() {
            if let Some(t) = field_type {
                embedded.push(t.trim_start_matches('*').to_string());
            }
            continue;
        }

        for name_node in names {
            let name = text(name_node, source);
            let mut symbol = declared(name, SymbolKind::Property, field, field, source, sink.file_path());
            symbol.return_type = field_type.clone();
            sink.push(symbol, Some(struct_id));
        }
    }

    if let Some(parent) = sink.get_mut(struct_id) {
        parent.extends = embedded;
    }
}

fn interface_methods(ty: Node, interface_id: &str, source: &str, sink: &mut SymbolSink) {
    let mut embedded = Vec::new();
    for member in named_children(ty) {
        match member.kind() {
            "method_elem" | "method_spec" => {
                let Some(name) = field_text(member, "name", source) else {
                    continue;
                };
                let mut symbol = declared(name, SymbolKind::Method, member, member, source, sink.file_path());
                callable_details(member, source, &mut symbol);
                sink.push(symbol, Some(interface_id));
            }
            "type_elem" | "constraint_elem" => embedded.push(text(member, source).to_string()),
            _ => {}
        }
    }
    if let Some(parent) = sink.get_mut(interface_id) {
        parent.extends = embedded;
    }
}

fn function(node: Node, source: &str, sink: &mut SymbolSink) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let mut symbol = declared(name, SymbolKind::Function, node, node, source, sink.file_path());
    callable_details(node, source, &mut symbol);
    sink.push(symbol, None);
}

fn method(node: Node, source: &str, sink: &mut SymbolSink) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let mut symbol = declared(name, SymbolKind::Method, node, node, source, sink.file_path());
    callable_details(node, source, &mut symbol);

    let parent = node
        .child_by_field_name("receiver")
        .and_then(|r| receiver_type(r, source))
        .and_then(|recv| sink.find_top_level(&recv).map(|s| s.id.clone()));
    sink.push(symbol, parent.as_deref());
}

/// `(s *Server)` → `Server`, `(l List[T])` → `List`.
fn receiver_type(receiver: Node, source: &str) -> Option<String> {
    let param = named_children(receiver)
        .into_iter()
        .find(|c| c.kind() == "parameter_declaration")?;
    let ty = field_text(param, "type", source)?;
    let ty = ty.trim_start_matches('*');
    let base = ty.split('[').next().unwrap_or(ty).trim();
    (!base.is_empty()).then(|| base.to_string())
}

fn callable_details(node: Node, source: &str, symbol: &mut Symbol) {
    if let Some(params) = node.child_by_field_name("parameters") {
        symbol.parameters = parameters(params, source);
    }
    symbol.return_type = field_text(node, "result", source).map(annotation);
}

fn parameters(list: Node, source: &str) -> Vec<Parameter> {
    let mut result = Vec::new();
    for param in named_children(list) {
        let variadic = match param.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let mut ty = field_text(param, "type", source).map(str::to_string);
        if variadic {
            ty = ty.map(|t| format!("...{}", t));
        }
        let names = children_by_field(param, "name");
        if names.is_empty() {
            result.push(Parameter {
                type_annotation: ty,
                ..Parameter::named("_")
            });
            continue;
        }
        for name in names {
            result.push(Parameter {
                type_annotation: ty.clone(),
                optional: variadic,
                ..Parameter::named(text(name, source))
            });
        }
    }
    result
}

fn values(decl: Node, source: &str, sink: &mut SymbolSink) {
    let kind = if decl.kind() == "const_declaration" {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    };

    let mut specs = Vec::new();
    for child in named_children(decl) {
        match child.kind() {
            "const_spec" | "var_spec" => specs.push(child),
            // `var ( ... )` wraps its specs in a list node.
            "var_spec_list" => specs.extend(named_children(child)),
            _ => {}
        }
    }
    let grouped = specs.len() > 1;

    for spec in specs {
        let ty = field_text(spec, "type", source).map(str::to_string);
        let anchor = if grouped { spec } else { decl };
        for name in children_by_field(spec, "name") {
            let name = text(name, source);
            if name == "_" {
                continue;
            }
            let mut symbol = declared(name, kind, spec, anchor, source, sink.file_path());
            symbol.return_type = ty.clone();
            sink.push(symbol, None);
        }
    }
}

fn import_declaration(decl: Node, source: &str) -> Vec<ImportInfo> {
    let mut specs = Vec::new();
    for child in named_children(decl) {
        match child.kind() {
            "import_spec" => specs.push(child),
            "import_spec_list" => specs.extend(
                named_children(child)
                    .into_iter()
                    .filter(|c| c.kind() == "import_spec"),
            ),
            _ => {}
        }
    }

    specs
        .into_iter()
        .filter_map(|spec| {
            let path = unquote(field_text(spec, "path", source)?);
            let local = field_text(spec, "name", source)
                .map(str::to_string)
                .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path).to_string());
            let mut import = ImportInfo::new(path, spec.start_position().row + 1);
            import.specifiers.push(ImportSpecifier::namespace(local));
            Some(import)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParseOutput {
        GoParser.parse(source, "server/server.go")
    }

    fn find<'a>(output: &'a ParseOutput, name: &str) -> &'a Symbol {
        output
            .symbols
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("symbol {name} not found"))
    }

    const SOURCE: &str = r#"// Package server serves requests.
package server

import (
	"fmt"
	nethttp "net/http"
)

import "./internal/util"

// Start runs the server.
func (s *Server) Start(addr string, opts ...Option) error {
	return nil
}

// Server handles requests.
type Server struct {
	Logger
	Addr    string
	timeout int
}

type Handler interface {
	Serve(req *Request) (int, error)
}

const MaxConns = 10

var (
	debug   = false
	Version string
)

func newServer() *Server { return nil }
"#;

    #[test]
    fn test_types_and_methods() {
        let output = parse(SOURCE);

        let server = find(&output, "Server");
        assert_eq!(server.kind, SymbolKind::Class);
        assert!(server.exported);
        assert_eq!(server.doc.as_deref(), Some("Server handles requests."));
        assert_eq!(server.extends, vec!["Logger"]);

        let start = find(&output, "Start");
        assert_eq!(start.kind, SymbolKind::Method);
        assert_eq!(start.id, "server/server.go#Server.Start");
        assert_eq!(start.doc.as_deref(), Some("Start runs the server."));
        assert_eq!(start.return_type.as_deref(), Some("error"));
        assert_eq!(start.parameters.len(), 2);
        assert_eq!(start.parameters[1].type_annotation.as_deref(), Some("...Option"));

        let timeout = find(&output, "timeout");
        assert_eq!(timeout.kind, SymbolKind::Property);
        assert_eq!(timeout.visibility, Visibility::Internal);
        assert_eq!(timeout.parent_id.as_deref(), Some(server.id.as_str()));

        let handler = find(&output, "Handler");
        assert_eq!(handler.kind, SymbolKind::Interface);
        assert_eq!(find(&output, "Serve").parent_id.as_deref(), Some(handler.id.as_str()));
    }

    #[test]
    fn test_values_and_functions() {
        let output = parse(SOURCE);

        assert_eq!(find(&output, "MaxConns").kind, SymbolKind::Constant);
        let debug = find(&output, "debug");
        assert_eq!(debug.kind, SymbolKind::Variable);
        assert!(!debug.exported);
        assert!(find(&output, "Version").exported);

        let ctor = find(&output, "newServer");
        assert_eq!(ctor.visibility, Visibility::Internal);
        assert_eq!(ctor.return_type.as_deref(), Some("*Server"));
    }

    #[test]
    fn test_imports_and_package_doc() {
        let output = parse(SOURCE);
        assert_eq!(output.module_doc.as_deref(), Some("Package server serves requests."));

        let sources: Vec<_> = output.imports.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["fmt", "net/http", "./internal/util"]);
        assert_eq!(output.imports[1].specifiers[0].alias.as_deref(), Some("nethttp"));
        assert_eq!(output.imports[0].specifiers[0].alias.as_deref(), Some("fmt"));
    }

    #[test]
    fn test_method_without_local_receiver_is_top_level() {
        let output = parse("package x\n\nfunc (c *Client) Do() {}\n");
        let method = find(&output, "Do");
        assert!(method.parent_id.is_none());
        assert_eq!(method.id, "server/server.go#Do");
    }
}
