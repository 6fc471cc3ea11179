use std::path::Path;

use tracing::debug;

use treestat_core::query::{find_all, find_all_of, preorder, strip_quotes};
use treestat_core::selector::DocumentFormat;
use treestat_core::{ConfigError, LanguageProfile, Node, ProfileMetrics, SelectorConfig};

const SELECTORS: &str = include_str!("../profiles/javascript.json");

const HOOKS: &[&str] = &[
    "useState",
    "useEffect",
    "useContext",
    "useReducer",
    "useCallback",
    "useMemo",
    "useRef",
];

const PERMISSION_CHECKS: &[&str] = &["checkPermissions", "requireAuth"];
const DEPRECATED_APIS: &[&str] = &["componentWillMount", "componentWillReceiveProps"];
const ROUTE_OBJECTS: &[&str] = &["app", "router"];
const ROUTE_METHODS: &[&str] = &["get", "post", "put", "delete", "use"];

const MODERN: &str = "modern";
const REACT: &str = "react";
const REACT_HOOKS: &str = "reactHooks";
const ANGULAR: &str = "angular";
const INFRASTRUCTURE: &str = "infrastructure";
const SECURITY: &str = "security";
const QUALITY: &str = "quality";
const ROUTES: &str = "routes";

/// Fixed profile for tree-sitter-javascript / tree-sitter-typescript trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptProfile;

impl JavaScriptProfile {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageProfile for JavaScriptProfile {
    fn language(&self) -> &'static str {
        "javascript"
    }

    fn selectors(&self) -> Result<SelectorConfig, ConfigError> {
        SelectorConfig::parse(
            SELECTORS,
            DocumentFormat::Json,
            Path::new("profiles/javascript.json"),
        )
    }

    fn inspect(&self, root: &Node, identity: &str) -> ProfileMetrics {
        let mut metrics = ProfileMetrics::new();
        modern_features(root, &mut metrics);
        frameworks(root, identity, &mut metrics);
        infrastructure(root, &mut metrics);
        security(root, &mut metrics);
        calls(root, &mut metrics);
        routes(root, identity, &mut metrics);
        metrics
    }
}

fn starts_with_keyword(node: &Node, keyword: &str) -> bool {
    node.text().is_some_and(|t| {
        t.strip_prefix(keyword)
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_whitespace()))
    })
}

fn modern_features(root: &Node, m: &mut ProfileMetrics) {
    let lexical = find_all(root, "lexical_declaration");
    m.add(
        MODERN,
        "constDeclarations",
        lexical.iter().filter(|n| starts_with_keyword(n, "const")).count(),
    );
    m.add(
        MODERN,
        "letDeclarations",
        lexical.iter().filter(|n| starts_with_keyword(n, "let")).count(),
    );
    m.add(MODERN, "varDeclarations", find_all(root, "variable_declaration").len());
    m.add(MODERN, "arrowFunctions", find_all(root, "arrow_function").len());
    m.add(MODERN, "templateLiterals", find_all(root, "template_string").len());
    m.add(
        MODERN,
        "destructuringAssignments",
        find_all_of(root, &["object_pattern", "array_pattern"]).len(),
    );
    m.add(MODERN, "spreadOperators", find_all(root, "spread_element").len());
}

fn has_child(node: &Node, kind: &str, pred: impl Fn(&str) -> bool) -> bool {
    node.children
        .iter()
        .any(|c| c.is(kind) && c.text().is_some_and(&pred))
}

fn frameworks(root: &Node, identity: &str, m: &mut ProfileMetrics) {
    let classes = find_all(root, "class_declaration");

    let class_components = classes
        .iter()
        .filter(|c| has_child(c, "class_heritage", |t| t.contains("Component")))
        .count();
    m.add(REACT, "classComponents", class_components);

    // One per file: a file rendering JSX without a class component.
    let renders_jsx = preorder(root)
        .any(|n| n.is("jsx_element") || n.is("jsx_self_closing_element"));
    let functional = usize::from(renders_jsx && class_components == 0);
    if functional > 0 {
        debug!("functional component in {identity}");
    }
    m.add(REACT, "functionalComponents", functional);

    for hook in HOOKS {
        m.add(REACT_HOOKS, hook, 0);
    }
    for call in find_all(root, "call_expression") {
        let callee = call.children.first().and_then(|c| c.text());
        if let Some(hook) = callee.and_then(|c| HOOKS.iter().find(|h| **h == c)) {
            m.add(REACT_HOOKS, hook, 1);
        }
    }

    let angular = classes
        .iter()
        .filter(|c| has_child(c, "decorator", |t| t.starts_with("@Component")))
        .count();
    m.add(ANGULAR, "components", angular);
}

fn infrastructure(root: &Node, m: &mut ProfileMetrics) {
    m.declare_values(INFRASTRUCTURE, "environmentVariables");
    for member in find_all(root, "member_expression") {
        // `process.env` alone is the object of the full access; skip it.
        if let Some(text) = member.text().filter(|t| {
            t.strip_prefix("process.env")
                .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        }) {
            m.insert_value(INFRASTRUCTURE, "environmentVariables", text);
        }
    }
}

fn security(root: &Node, m: &mut ProfileMetrics) {
    let mut dangerous = 0;
    let mut anonymous = 0;
    for attr in find_all(root, "jsx_attribute") {
        if attr
            .children
            .first()
            .and_then(|c| c.text())
            .is_some_and(|t| t == "dangerouslySetInnerHTML")
        {
            dangerous += 1;
        }
        let inline_function = attr.children.iter().any(|c| {
            c.is("jsx_expression")
                && preorder(c).any(|n| n.is("arrow_function") || n.is("function_expression"))
        });
        if inline_function {
            anonymous += 1;
        }
    }
    m.add(SECURITY, "dangerouslySetInnerHTML", dangerous);
    m.add(SECURITY, "anonymousFunctionsInProps", anonymous);
}

fn starts_with_any(node: &Node, prefixes: &[&str]) -> bool {
    node.text()
        .is_some_and(|t| prefixes.iter().any(|p| t.starts_with(p)))
}

fn calls(root: &Node, m: &mut ProfileMetrics) {
    let calls = find_all(root, "call_expression");
    m.add(
        SECURITY,
        "permissionChecks",
        calls.iter().filter(|c| starts_with_any(c, PERMISSION_CHECKS)).count(),
    );
    m.add(
        QUALITY,
        "deprecatedApiCalls",
        calls.iter().filter(|c| starts_with_any(c, DEPRECATED_APIS)).count(),
    );
}

/// `app.get`, `router.post` and friends; returns the upper-cased method.
fn express_method(callee: &Node) -> Option<String> {
    if !callee.is("member_expression") {
        return None;
    }
    let (object, method) = callee.text()?.split_once('.')?;
    (ROUTE_OBJECTS.contains(&object) && ROUTE_METHODS.contains(&method))
        .then(|| method.to_uppercase())
}

fn routes(root: &Node, identity: &str, m: &mut ProfileMetrics) {
    m.declare_values(ROUTES, "endpointPaths");

    // <Route ...> in React Router trees.
    let mut endpoints = find_all(root, "jsx_opening_element")
        .into_iter()
        .filter(|e| e.children.first().and_then(|c| c.text()) == Some("Route"))
        .count();

    for call in find_all(root, "call_expression") {
        let Some(method) = call.children.first().and_then(express_method) else {
            continue;
        };
        endpoints += 1;
        let path = call
            .children
            .get(1)
            .and_then(|args| args.children.first())
            .and_then(|first| first.text())
            .map(strip_quotes);
        if let Some(path) = path {
            debug!("route {method} {path} in {identity}");
            m.insert_value(ROUTES, "endpointPaths", format!("{method} {path}"));
        }
    }
    m.add(ROUTES, "apiEndpointDefinitions", endpoints);
}

#[cfg(test)]
mod tests {
    use super::*;
    use treestat_core::{Config, Extractor};

    fn leaf(kind: &str, text: &str) -> Node {
        Node::new(kind).with_text(text)
    }

    #[test]
    fn test_builtin_selectors_are_valid() {
        let selectors = JavaScriptProfile.selectors().unwrap();
        assert_eq!(selectors.language, "javascript");
        assert!(selectors.selectors.patterns.contains_key("networkCalls"));
        assert!(selectors.dependency_maps.contains_key("cloudSDKs"));
    }

    #[test]
    fn test_modern_features() {
        let tree = Node::new("program").with_children(vec![
            leaf("lexical_declaration", "const a = 1;"),
            leaf("lexical_declaration", "let b = 2;"),
            leaf("lexical_declaration", "constant = 3"),
            leaf("variable_declaration", "var c = 3;"),
            leaf("arrow_function", "() => 1"),
            leaf("template_string", "`x${a}`"),
            leaf("object_pattern", "{ a }"),
            leaf("array_pattern", "[b]"),
            leaf("spread_element", "...rest"),
        ]);
        let m = JavaScriptProfile.inspect(&tree, "a.js");
        assert_eq!(m.count(MODERN, "constDeclarations"), 1);
        assert_eq!(m.count(MODERN, "letDeclarations"), 1);
        assert_eq!(m.count(MODERN, "varDeclarations"), 1);
        assert_eq!(m.count(MODERN, "arrowFunctions"), 1);
        assert_eq!(m.count(MODERN, "templateLiterals"), 1);
        assert_eq!(m.count(MODERN, "destructuringAssignments"), 2);
        assert_eq!(m.count(MODERN, "spreadOperators"), 1);
    }

    #[test]
    fn test_react_class_and_hooks() {
        let class = Node::new("class_declaration").with_children(vec![
            leaf("identifier", "App"),
            leaf("class_heritage", "extends React.Component"),
        ]);
        let hook_call = |name: &str| {
            Node::new("call_expression")
                .with_text(&format!("{name}(0)"))
                .with_children(vec![leaf("identifier", name), Node::new("arguments")])
        };
        let tree = Node::new("program").with_children(vec![
            class,
            hook_call("useState"),
            hook_call("useState"),
            hook_call("useEffect"),
            hook_call("setState"),
            Node::new("jsx_element"),
        ]);
        let m = JavaScriptProfile.inspect(&tree, "src/App.jsx");
        assert_eq!(m.count(REACT, "classComponents"), 1);
        assert_eq!(m.count(REACT, "functionalComponents"), 0);
        assert_eq!(m.count(REACT_HOOKS, "useState"), 2);
        assert_eq!(m.count(REACT_HOOKS, "useEffect"), 1);
        assert_eq!(m.count(REACT_HOOKS, "useMemo"), 0);
        assert_eq!(m.sections[REACT_HOOKS].counts.len(), HOOKS.len());
    }

    #[test]
    fn test_functional_component_counted_once_per_file() {
        let tree = Node::new("program").with_children(vec![
            Node::new("jsx_element"),
            Node::new("jsx_self_closing_element"),
        ]);
        let m = JavaScriptProfile.inspect(&tree, "src/Nav.jsx");
        assert_eq!(m.count(REACT, "functionalComponents"), 1);
    }

    #[test]
    fn test_angular_component_decorator() {
        let tree = Node::new("program").with_children(vec![Node::new("class_declaration")
            .with_children(vec![
                leaf("decorator", "@Component({selector: 'app-root'})"),
                leaf("identifier", "AppComponent"),
            ])]);
        let m = JavaScriptProfile.inspect(&tree, "app.component.ts");
        assert_eq!(m.count(ANGULAR, "components"), 1);
    }

    #[test]
    fn test_environment_variables_distinct() {
        let access = |name: &str| {
            Node::new("member_expression")
                .with_text(&format!("process.env.{name}"))
                .with_children(vec![leaf("member_expression", "process.env")])
        };
        let tree = Node::new("program").with_children(vec![
            access("API_KEY"),
            access("API_KEY"),
            access("PORT"),
        ]);
        let m = JavaScriptProfile.inspect(&tree, "config.js");
        let vars: Vec<_> = m
            .values(INFRASTRUCTURE, "environmentVariables")
            .unwrap()
            .iter()
            .cloned()
            .collect();
        assert_eq!(vars, vec!["process.env.API_KEY", "process.env.PORT"]);
    }

    #[test]
    fn test_security_checks() {
        let dangerous = Node::new("jsx_attribute").with_children(vec![
            leaf("property_identifier", "dangerouslySetInnerHTML"),
            Node::new("jsx_expression"),
        ]);
        let inline_handler = Node::new("jsx_attribute").with_children(vec![
            leaf("property_identifier", "onClick"),
            Node::new("jsx_expression").with_children(vec![leaf("arrow_function", "() => go()")]),
        ]);
        let plain = Node::new("jsx_attribute").with_children(vec![
            leaf("property_identifier", "className"),
            leaf("string", "\"nav\""),
        ]);
        let tree = Node::new("program").with_children(vec![dangerous, inline_handler, plain]);
        let m = JavaScriptProfile.inspect(&tree, "a.jsx");
        assert_eq!(m.count(SECURITY, "dangerouslySetInnerHTML"), 1);
        assert_eq!(m.count(SECURITY, "anonymousFunctionsInProps"), 1);
    }

    #[test]
    fn test_permission_checks_and_deprecated_calls() {
        let call = |text: &str| leaf("call_expression", text);
        let tree = Node::new("program").with_children(vec![
            call("checkPermissions(user, 'admin')"),
            call("requireAuth(req)"),
            call("auth.requireAuth(req)"),
            call("componentWillMount()"),
            call("componentWillReceiveProps(next)"),
            call("componentDidMount()"),
        ]);
        let m = JavaScriptProfile.inspect(&tree, "src/Admin.jsx");
        assert_eq!(m.count(SECURITY, "permissionChecks"), 2);
        assert_eq!(m.count(QUALITY, "deprecatedApiCalls"), 2);
    }

    #[test]
    fn test_express_and_jsx_routes() {
        let route = |callee: &str, path: &str| {
            Node::new("call_expression")
                .with_text(&format!("{callee}('{path}', handler)"))
                .with_children(vec![
                    leaf("member_expression", callee),
                    Node::new("arguments").with_children(vec![
                        leaf("string", &format!("'{path}'")),
                        leaf("identifier", "handler"),
                    ]),
                ])
        };
        let jsx_route = Node::new("jsx_opening_element")
            .with_text("<Route path=\"/home\">")
            .with_children(vec![leaf("identifier", "Route")]);
        let jsx_other = Node::new("jsx_opening_element")
            .with_text("<Switch>")
            .with_children(vec![leaf("identifier", "Switch")]);
        let tree = Node::new("program").with_children(vec![
            route("app.get", "/users"),
            route("router.post", "/users"),
            route("app.listen", "3000"),
            route("client.get", "/remote"),
            jsx_route,
            jsx_other,
        ]);
        let m = JavaScriptProfile.inspect(&tree, "server.js");
        assert_eq!(m.count(ROUTES, "apiEndpointDefinitions"), 3);
        let paths: Vec<_> = m.values(ROUTES, "endpointPaths").unwrap().iter().cloned().collect();
        assert_eq!(paths, vec!["GET /users", "POST /users"]);
    }

    #[test]
    fn test_nullish_coalescing_and_try_nesting() {
        let selectors = JavaScriptProfile.selectors().unwrap();
        let extractor = Extractor::new(&selectors, &Config::default(), None).unwrap();
        let function = Node::new("function_declaration").with_children(vec![
            Node::new("binary_expression")
                .with_text("port ?? 3000")
                .with_children(vec![leaf("identifier", "port"), leaf("number", "3000")]),
            Node::new("try_statement").with_children(vec![Node::new("if_statement")
                .with_children(vec![Node::new("statement_block")])]),
        ]);
        let tree = Node::new("program").with_span(0, 5).with_children(vec![function]);
        let m = extractor.extract(&tree, "src/server.js");
        assert_eq!(m.total_cyclomatic, 3);
        assert_eq!(m.max_nesting_depth, 2);
    }

    #[test]
    fn test_extractor_with_profile() {
        let selectors = JavaScriptProfile.selectors().unwrap();
        let extractor =
            Extractor::new(&selectors, &Config::default(), Some(Box::new(JavaScriptProfile)))
                .unwrap();
        let tree: Node = serde_json::from_str(
            r#"{"type": "program",
                "startPosition": {"row": 0, "column": 0}, "endPosition": {"row": 2, "column": 0},
                "children": [
                  {"type": "import_statement", "text": "import AWS from '@aws-sdk/client-s3';",
                   "children": [{"type": "string", "text": "'@aws-sdk/client-s3'"}]},
                  {"type": "call_expression", "text": "axios.get('https://api.example.com/users')",
                   "children": [{"type": "member_expression", "text": "axios.get"},
                                {"type": "arguments", "children": [
                                  {"type": "string", "text": "'https://api.example.com/users'"}]}]},
                  {"type": "call_expression", "text": "save(request.body)",
                   "children": [{"type": "identifier", "text": "save"}]},
                  {"type": "call_expression", "text": "crypto.randomUUID()",
                   "children": [{"type": "member_expression", "text": "crypto.randomUUID"}]},
                  {"type": "lexical_declaration", "text": "const host = '10.1.2.3';",
                   "children": [{"type": "string", "text": "'10.1.2.3'"}]}
                ]}"#,
        )
        .unwrap();
        let m = extractor.extract(&tree, "src/api.js");
        assert_eq!(m.patterns["networkCalls"].count, 1);
        assert_eq!(m.patterns["userInputHandlers"].count, 1);
        assert_eq!(m.patterns["cryptoUsage"].count, 1);
        assert_eq!(m.hardcoded_urls, vec!["https://api.example.com/users", "10.1.2.3"]);
        assert_eq!(m.imports[0].name, "@aws-sdk/client-s3");
        assert_eq!(m.profile.count(MODERN, "arrowFunctions"), 0);
        assert!(m.profile.sections.contains_key(SECURITY));
    }
}
