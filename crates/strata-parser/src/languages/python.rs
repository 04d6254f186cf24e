//! Python parser.
//!
//! Names follow the usual conventions: `__dunder__` is public, anything else
//! with a leading underscore is private. When a module
//! defines `__all__`, only the names it lists are exported. Relative imports
//! are rewritten to path form so they can be resolved against the tree.

use super::{annotation, field_text, location, named_children, parse_tree, signature, text, unquote};
use crate::imports::{ImportInfo, ImportSpecifier};
use crate::language::Language;
use crate::registry::{LanguageParser, ParseOutput};
use crate::symbols::{Parameter, Symbol, SymbolKind, SymbolSink, Visibility};
use tree_sitter::Node;

pub struct PythonParser;

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&self, content: &str, file_path: &str) -> ParseOutput {
        let Some(tree) = parse_tree(tree_sitter_python::LANGUAGE.into(), content, file_path)
        else {
            return ParseOutput::default();
        };
        let root = tree.root_node();

        let mut sink = SymbolSink::new(file_path);
        let mut imports = Vec::new();
        let mut dunder_all: Option<Vec<String>> = None;

        for stmt in named_children(root) {
            match stmt.kind() {
                "import_statement" | "import_from_statement" => {
                    imports.extend(parse_import(stmt, content));
                }
                "expression_statement" => {
                    if let Some(names) = dunder_all_names(stmt, content) {
                        dunder_all = Some(names);
                        continue;
                    }
                    assignment(stmt, content, &mut sink, None);
                }
                _ => definition(stmt, stmt, content, &mut sink, None),
            }
        }

        for symbol in sink.iter_mut() {
            if symbol.parent_id.is_some() {
                continue;
            }
            symbol.exported = match &dunder_all {
                Some(names) => names.contains(&symbol.name),
                None => symbol.visibility == Visibility::Public,
            };
        }

        ParseOutput {
            symbols: sink.finish(),
            imports,
            exports: Vec::new(),
            module_doc: block_docstring(root, content),
        }
    }
}

/// Function or class, possibly under decorators. `anchor` is the outermost
/// node, used for the symbol's location.
fn definition(node: Node, anchor: Node, source: &str, sink: &mut SymbolSink, class_id: Option<&str>) {
    match node.kind() {
        "decorated_definition" => {
            if let Some(inner) = node.child_by_field_name("definition") {
                definition(inner, anchor, source, sink, class_id);
            }
        }
        "function_definition" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            let kind = if class_id.is_some() {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            let mut symbol = Symbol::new(name, kind, location(anchor, sink.file_path()))
                .with_visibility(visibility(name))
                .with_signature(signature(node, source))
                .with_doc(node.child_by_field_name("body").and_then(|b| block_docstring(b, source)));
            if let Some(params) = node.child_by_field_name("parameters") {
                symbol.parameters = parameters(params, source, class_id.is_some());
            }
            symbol.return_type = field_text(node, "return_type", source).map(annotation);
            sink.push(symbol, class_id);
        }
        "class_definition" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            let body = node.child_by_field_name("body");
            let mut symbol = Symbol::new(name, SymbolKind::Class, location(anchor, sink.file_path()))
                .with_visibility(visibility(name))
                .with_signature(signature(node, source))
                .with_doc(body.and_then(|b| block_docstring(b, source)));
            if let Some(bases) = node.child_by_field_name("superclasses") {
                symbol.extends = named_children(bases)
                    .into_iter()
                    .filter(|b| b.kind() != "keyword_argument")
                    .map(|b| text(b, source).to_string())
                    .collect();
            }
            let id = sink.push(symbol, class_id);

            let Some(body) = body else {
                return;
            };
            for member in named_children(body) {
                if member.kind() == "expression_statement" {
                    assignment(member, source, sink, Some(id.as_str()));
                } else {
                    definition(member, member, source, sink, Some(id.as_str()));
                }
            }
        }
        _ => {}
    }
}

/// `NAME = value` / `name: T = value` at module or class level.
fn assignment(stmt: Node, source: &str, sink: &mut SymbolSink, class_id: Option<&str>) {
    for child in named_children(stmt) {
        if child.kind() != "assignment" {
            continue;
        }
        let Some(left) = child.child_by_field_name("left") else {
            continue;
        };
        if left.kind() != "identifier" {
            continue;
        }
        let name = text(left, source);
        let kind = if class_id.is_some() {
            SymbolKind::Property
        } else if is_constant_name(name) {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        };
        let mut symbol = Symbol::new(name, kind, location(stmt, sink.file_path()))
            .with_visibility(visibility(name))
            .with_signature(signature(stmt, source));
        symbol.return_type = field_text(child, "type", source).map(annotation);
        sink.push(symbol, class_id);
    }
}

fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn visibility(name: &str) -> Visibility {
    let dunder = name.len() > 4 && name.starts_with("__") && name.ends_with("__");
    if name.starts_with('_') && !dunder {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn parameters(params: Node, source: &str, is_method: bool) -> Vec<Parameter> {
    let mut result = Vec::new();
    for (index, param) in named_children(params).into_iter().enumerate() {
        let parameter = match param.kind() {
            "identifier" => Parameter::named(text(param, source)),
            "typed_parameter" => {
                let name = named_children(param)
                    .into_iter()
                    .find(|c| c.kind() != "type")
                    .map(|c| text(c, source))
                    .unwrap_or_default();
                Parameter {
                    type_annotation: field_text(param, "type", source).map(annotation),
                    ..Parameter::named(name)
                }
            }
            "default_parameter" | "typed_default_parameter" => Parameter {
                name: field_text(param, "name", source).unwrap_or_default().to_string(),
                type_annotation: field_text(param, "type", source).map(annotation),
                default_value: field_text(param, "value", source).map(str::to_string),
                optional: true,
            },
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                Parameter::named(text(param, source))
            }
            _ => continue,
        };
        if is_method && index == 0 && (parameter.name == "self" || parameter.name == "cls") {
            continue;
        }
        result.push(parameter);
    }
    result
}

/// The docstring of a module or block: a string literal as first statement.
fn block_docstring(block: Node, source: &str) -> Option<String> {
    let first = named_children(block)
        .into_iter()
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = named_children(first).into_iter().next()?;
    if string.kind() != "string" {
        return None;
    }
    let doc = clean_docstring(text(string, source));
    (!doc.is_empty()).then_some(doc)
}

fn clean_docstring(raw: &str) -> String {
    let raw = raw.trim_start_matches(|c: char| matches!(c, 'r' | 'R' | 'u' | 'U' | 'b' | 'B'));
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| raw.strip_prefix(q).and_then(|s| s.strip_suffix(q)))
        .unwrap_or(raw);
    inner
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn dunder_all_names(stmt: Node, source: &str) -> Option<Vec<String>> {
    let assign = named_children(stmt)
        .into_iter()
        .find(|c| c.kind() == "assignment")?;
    if field_text(assign, "left", source) != Some("__all__") {
        return None;
    }
    let right = assign.child_by_field_name("right")?;
    if !matches!(right.kind(), "list" | "tuple") {
        return None;
    }
    Some(
        named_children(right)
            .into_iter()
            .filter(|n| n.kind() == "string")
            .map(|n| unquote(text(n, source)))
            .collect(),
    )
}

fn parse_import(stmt: Node, source: &str) -> Vec<ImportInfo> {
    let line = stmt.start_position().row + 1;

    if stmt.kind() == "import_statement" {
        // `import a.b, c as d` is one import per module.
        return named_children(stmt)
            .into_iter()
            .filter_map(|name| {
                let (module, alias) = match name.kind() {
                    "aliased_import" => (
                        field_text(name, "name", source)?,
                        field_text(name, "alias", source).map(str::to_string),
                    ),
                    _ => (text(name, source), None),
                };
                let mut import = ImportInfo::new(module, line);
                import.specifiers.push(ImportSpecifier::aliased(module, alias));
                Some(import)
            })
            .collect();
    }

    let Some(module) = field_text(stmt, "module_name", source) else {
        return Vec::new();
    };
    let mut import = ImportInfo::new(relative_module_path(module), line);

    for name in named_children(stmt) {
        if stmt.child_by_field_name("module_name") == Some(name) {
            continue;
        }
        match name.kind() {
            "wildcard_import" => import.specifiers.push(ImportSpecifier::namespace("*")),
            "aliased_import" => {
                if let Some(n) = field_text(name, "name", source) {
                    let alias = field_text(name, "alias", source).map(str::to_string);
                    import.specifiers.push(ImportSpecifier::aliased(n, alias));
                }
            }
            "dotted_name" => import.specifiers.push(ImportSpecifier::named(text(name, source))),
            _ => {}
        }
    }

    vec![import]
}

/// `.utils` → `./utils`, `..pkg.mod` → `../pkg/mod`, `.` → `.`.
/// Absolute module names are returned unchanged.
fn relative_module_path(module: &str) -> String {
    let dots = module.chars().take_while(|c| *c == '.').count();
    if dots == 0 {
        return module.to_string();
    }

    let rest = module[dots..].replace('.', "/");
    let prefix = if dots == 1 {
        ".".to_string()
    } else {
        vec![".."; dots - 1].join("/")
    };

    if rest.is_empty() {
        prefix
    } else {
        format!("{}/{}", prefix, rest)
    }
}
