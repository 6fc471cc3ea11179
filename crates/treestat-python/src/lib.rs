use std::path::Path;

use tracing::debug;

use treestat_core::query::{find_all, strip_quotes};
use treestat_core::selector::DocumentFormat;
use treestat_core::{ConfigError, LanguageProfile, Node, ProfileMetrics, SelectorConfig};

const SELECTORS: &str = include_str!("../profiles/python.toml");

/// Attribute-call suffixes that indicate a database query.
const DB_METHODS: &[&str] = &[
    ".query",
    ".execute",
    ".fetchone",
    ".fetchall",
    ".insert_one",
    ".find_one",
    ".add",
    ".commit",
];

const IDIOMS: &str = "python";
const ROUTES: &str = "routes";
const DJANGO: &str = "django";
const DATABASE: &str = "database";
const INFRASTRUCTURE: &str = "infrastructure";

/// Fixed profile for tree-sitter-python trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonProfile;

impl PythonProfile {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageProfile for PythonProfile {
    fn language(&self) -> &'static str {
        "python"
    }

    fn selectors(&self) -> Result<SelectorConfig, ConfigError> {
        SelectorConfig::parse(SELECTORS, DocumentFormat::Toml, Path::new("profiles/python.toml"))
    }

    fn inspect(&self, root: &Node, identity: &str) -> ProfileMetrics {
        let mut m = ProfileMetrics::new();
        idioms(root, &mut m);
        routes(root, identity, &mut m);
        django_models(root, &mut m);
        calls(root, &mut m);
        m
    }
}

/// `f"..."`, `rf'...'`, `Fr"""..."""` and friends.
fn is_f_string(text: &str) -> bool {
    let prefix: String = text
        .chars()
        .take_while(|c| *c != '\'' && *c != '"')
        .collect();
    prefix.len() <= 2 && prefix.chars().any(|c| c == 'f' || c == 'F')
}

fn idioms(root: &Node, m: &mut ProfileMetrics) {
    let f_strings = find_all(root, "string")
        .into_iter()
        .filter(|s| s.text().is_some_and(is_f_string))
        .count();
    m.add(IDIOMS, "fStrings", f_strings);
    m.add(IDIOMS, "listComprehensions", find_all(root, "list_comprehension").len());
    m.add(IDIOMS, "dictComprehensions", find_all(root, "dictionary_comprehension").len());
    m.add(IDIOMS, "generatorExpressions", find_all(root, "generator_expression").len());
}

/// Text of the first string inside the first `argument_list` under `node`.
fn first_string_argument(node: &Node) -> Option<String> {
    let args = find_all(node, "argument_list").into_iter().next()?;
    let string = find_all(args, "string").into_iter().next()?;
    string.text().map(strip_quotes)
}

fn routes(root: &Node, identity: &str, m: &mut ProfileMetrics) {
    m.declare_values(ROUTES, "endpointPaths");
    let mut endpoints = 0;
    for definition in find_all(root, "decorated_definition") {
        for decorator in definition.children.iter().filter(|c| c.is("decorator")) {
            let Some(text) = decorator.text() else {
                continue;
            };
            if !(text.contains("@app.route") || text.contains(".route(")) {
                continue;
            }
            endpoints += 1;
            let path = find_all(decorator, "call")
                .into_iter()
                .next()
                .and_then(first_string_argument);
            if let Some(path) = path {
                debug!("route {path} in {identity}");
                m.insert_value(ROUTES, "endpointPaths", path);
            }
        }
    }
    m.add(ROUTES, "endpointsDefined", endpoints);
}

fn django_models(root: &Node, m: &mut ProfileMetrics) {
    let models = find_all(root, "class_definition")
        .into_iter()
        .filter(|class| {
            find_all(class, "argument_list")
                .first()
                .and_then(|args| args.text())
                .is_some_and(|t| t.contains("models.Model"))
        })
        .count();
    m.add(DJANGO, "models", models);
}

fn calls(root: &Node, m: &mut ProfileMetrics) {
    m.declare_values(INFRASTRUCTURE, "environmentVariables");
    let mut queries = 0;
    for call in find_all(root, "call") {
        let is_query = call.children.first().is_some_and(|callee| {
            callee.is("attribute")
                && callee
                    .text()
                    .is_some_and(|t| DB_METHODS.iter().any(|db| t.contains(db)))
        });
        if is_query {
            queries += 1;
        }

        let reads_env = call
            .text()
            .is_some_and(|t| t.contains("os.getenv") || t.contains("os.environ"));
        if let Some(name) = reads_env.then(|| first_string_argument(call)).flatten() {
            m.insert_value(INFRASTRUCTURE, "environmentVariables", name);
        }
    }
    m.add(DATABASE, "queries", queries);

    // os.environ["NAME"]
    for subscript in find_all(root, "subscript") {
        if !subscript.text().is_some_and(|t| t.starts_with("os.environ[")) {
            continue;
        }
        if let Some(name) = find_all(subscript, "string")
            .into_iter()
            .next()
            .and_then(|s| s.text())
        {
            m.insert_value(INFRASTRUCTURE, "environmentVariables", strip_quotes(name));
        }
    }
}
