//! Pattern rules for TypeScript/JavaScript sources.

use regex::Captures;

use super::{Api, Atom, Component, ComponentKind, Hook, Layout, Page, Prop, StateAction, StateModule};
use crate::analysers::pattern::{Rule, RuleSet};
use crate::error::Result;

const IMPORT: &str = r#"import\s+(?:(?P<default>\w+)\s*,?\s*)?(?:\{(?P<named>[^}]*)\})?\s*from\s+['"](?P<source>[^'"]+)['"]"#;
const API_CALL: &str =
    r#"\b(?:fetch|axios\.(?:get|post|put|patch|delete))\s*\(\s*['"`](?P<url>[^'"`]+)['"`]"#;

/// Hooks whose last argument is a dependency array.
const DEPENDENCY_HOOKS: &[&str] = &["useEffect", "useLayoutEffect", "useMemo", "useCallback"];

fn is_pascal_case(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn is_local_source(source: &str) -> bool {
    source.starts_with('.') || source.starts_with("@/") || source.starts_with("~/")
}

/// PascalCase bindings imported from project-local modules.
fn push_imports(list: &mut Vec<String>, caps: &Captures) {
    if !is_local_source(&caps["source"]) {
        return;
    }
    let default = caps.name("default").map(|m| m.as_str().to_string());
    let named = caps
        .name("named")
        .map(|m| m.as_str())
        .unwrap_or_default()
        .split(',')
        .filter_map(|item| {
            let item = item.trim();
            let binding = match item.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => item,
            };
            (!binding.is_empty()).then(|| binding.to_string())
        });
    for name in default.into_iter().chain(named) {
        if is_pascal_case(&name) && !list.contains(&name) {
            list.push(name);
        }
    }
}

fn push_api_call(list: &mut Vec<String>, caps: &Captures) {
    let url = caps["url"].to_string();
    if !list.contains(&url) {
        list.push(url);
    }
}

/// `name?: type;` lines of a props declaration.
pub fn parse_props(block: &str) -> Vec<Prop> {
    block
        .split(|c| c == ';' || c == '\n')
        .filter_map(|line| {
            let line = line.trim().trim_end_matches(',');
            let (name, prop_type) = line.split_once(':')?;
            let name = name.trim();
            let (name, required) = match name.strip_suffix('?') {
                Some(n) => (n.trim(), false),
                None => (name, true),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return None;
            }
            Some(Prop {
                name: name.to_string(),
                prop_type: prop_type.trim().to_string(),
                required,
            })
        })
        .collect()
}

pub fn component_rules() -> Result<RuleSet<Component>> {
    Ok(RuleSet::new(vec![
        Rule::<Component>::first(
            "client_directive",
            r#"(?m)^\s*['"]use client['"]"#,
            |c, _| c.client = true,
        )?,
        Rule::<Component>::first(
            "server_directive",
            r#"(?m)^\s*['"]use server['"]"#,
            |c, _| c.server = true,
        )?,
        Rule::<Component>::first(
            "class_component",
            r"class\s+\w+\s+extends\s+(?:React\.)?(?:Pure)?Component\b",
            |c, _| c.kind = ComponentKind::Class,
        )?,
        Rule::<Component>::first(
            "props",
            r"(?:interface|type)\s+\w*Props\s*=?\s*\{(?P<body>[^}]*)\}",
            |c, caps| c.props = parse_props(&caps["body"]),
        )?,
        Rule::<Component>::each("hook", r"\b(?P<hook>use[A-Z]\w*)\s*\(", |c, caps| {
            let name = &caps["hook"];
            if !DEPENDENCY_HOOKS.contains(&name) {
                c.hooks.push(Hook {
                    name: name.to_string(),
                    dependencies: Vec::new(),
                });
            }
        })?,
        Rule::<Component>::each(
            "dependency_hook",
            r"(?s)\b(?P<hook>useEffect|useLayoutEffect|useMemo|useCallback)\s*\(.*?,\s*\[(?P<deps>[^\]]*)\]\s*\)",
            |c, caps| {
                c.hooks.push(Hook {
                    name: caps["hook"].to_string(),
                    dependencies: caps["deps"]
                        .split(',')
                        .map(|d| d.trim().to_string())
                        .filter(|d| !d.is_empty())
                        .collect(),
                })
            },
        )?,
        Rule::<Component>::each("import", IMPORT, |c, caps| push_imports(&mut c.imports, caps))?,
    ]))
}

pub fn page_rules() -> Result<RuleSet<Page>> {
    Ok(RuleSet::new(vec![
        Rule::<Page>::each("import", IMPORT, |p, caps| push_imports(&mut p.components, caps))?,
        Rule::<Page>::each("api_call", API_CALL, |p, caps| push_api_call(&mut p.apis, caps))?,
    ]))
}

pub fn layout_rules() -> Result<RuleSet<Layout>> {
    Ok(RuleSet::new(vec![
        Rule::<Layout>::first(
            "name",
            r"export\s+default\s+(?:async\s+)?function\s+(?P<name>\w+)",
            |l, caps| l.name = caps["name"].to_string(),
        )?,
        Rule::<Layout>::each("import", IMPORT, |l, caps| push_imports(&mut l.components, caps))?,
    ]))
}

pub fn redux_rules() -> Result<RuleSet<StateModule>> {
    Ok(RuleSet::new(vec![
        Rule::<StateModule>::each(
            "slice",
            r#"createSlice\s*\(\s*\{\s*name\s*:\s*['"](?P<slice>[\w/-]+)['"]"#,
            |m, caps| m.slices.push(caps["slice"].to_string()),
        )?,
        Rule::<StateModule>::each(
            "reducer",
            r"(?m)^\s*(?P<name>\w+)\s*(?::\s*(?:\([^)]*\)|\w+)\s*=>|\(\s*state\b)",
            |m, caps| {
                let name = &caps["name"];
                if name != "reducers" && name != "extraReducers" {
                    m.actions.push(StateAction {
                        name: name.to_string(),
                        kind: "reducer".to_string(),
                    });
                }
            },
        )?,
    ]))
}

pub fn zustand_rules() -> Result<RuleSet<StateModule>> {
    Ok(RuleSet::new(vec![Rule::<StateModule>::each(
        "setter",
        r"(?P<name>\w+)\s*:\s*(?:async\s+)?\([^)]*\)\s*=>\s*(?:\{\s*)?set\s*\(",
        |m, caps| {
            m.actions.push(StateAction {
                name: caps["name"].to_string(),
                kind: "setter".to_string(),
            })
        },
    )?]))
}

pub fn jotai_rules() -> Result<RuleSet<StateModule>> {
    Ok(RuleSet::new(vec![Rule::<StateModule>::each(
        "atom",
        r"(?:const|let)\s+(?P<name>\w+)\s*=\s*atom\s*(?:<[^>]*>)?\s*\((?P<default>[^)]*)\)",
        |m, caps| {
            let default = caps["default"].trim();
            m.atoms.push(Atom {
                name: caps["name"].to_string(),
                default: (!default.is_empty()).then(|| default.to_string()),
            })
        },
    )?]))
}

pub fn api_rules() -> Result<RuleSet<Api>> {
    Ok(RuleSet::new(vec![
        Rule::<Api>::each(
            "exported_method",
            r"export\s+(?:async\s+function|function|const)\s+(?P<method>GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\b",
            |a, caps| push_method(&mut a.methods, &caps["method"]),
        )?,
        Rule::<Api>::each(
            "method_check",
            r#"req\.method\s*===?\s*['"](?P<method>\w+)['"]"#,
            |a, caps| push_method(&mut a.methods, &caps["method"].to_uppercase()),
        )?,
        Rule::<Api>::first(
            "handler",
            r"export\s+default\s+(?:async\s+)?function\s+(?P<name>\w+)",
            |a, caps| a.handler = Some(caps["name"].to_string()),
        )?,
        Rule::<Api>::each(
            "middleware",
            r"\.use\(\s*(?P<name>[\w.]+)",
            |a, caps| a.middleware.push(caps["name"].to_string()),
        )?,
    ]))
}

fn push_method(methods: &mut Vec<String>, method: &str) {
    if !methods.iter().any(|m| m == method) {
        methods.push(method.to_string());
    }
}
