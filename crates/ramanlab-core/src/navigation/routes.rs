use std::collections::BTreeMap;

/// A route the host can navigate to.
///
/// Patterns are `/`-separated; a segment starting with `:` captures one path
/// segment. A route with `redirect` set forwards to that path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub pattern: String,
    pub name: Option<String>,
    pub requires_auth: bool,
    pub redirect: Option<String>,
}

impl Route {
    pub fn public(pattern: &str, name: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            name: Some(name.to_string()),
            requires_auth: false,
            redirect: None,
        }
    }

    pub fn protected(pattern: &str, name: &str) -> Self {
        Self {
            requires_auth: true,
            ..Self::public(pattern, name)
        }
    }

    pub fn redirect(pattern: &str, to: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            name: None,
            requires_auth: false,
            redirect: Some(to.to_string()),
        }
    }

    /// Match a path (without query string), returning captured params
    fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let pattern: Vec<&str> = segments(&self.pattern).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, got) in pattern.iter().zip(&actual) {
            if let Some(name) = expected.strip_prefix(':') {
                params.insert(name.to_string(), got.to_string());
            } else if expected != got {
                return None;
            }
        }
        Some(params)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Result of resolving a path against the table
#[derive(Debug, Clone)]
pub struct ResolvedRoute<'a> {
    pub route: &'a Route,
    pub path: String,
    pub params: BTreeMap<String, String>,
}

/// Ordered route table; the first matching route wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Routes of the lab application. Everything behind the main layout
    /// requires a session.
    pub fn default_routes() -> Self {
        Self::new()
            .with(Route::public("/login", "Login"))
            .with(Route::public("/register", "Register"))
            .with(Route::redirect("/", "/dashboard"))
            .with(Route::protected("/dashboard", "Dashboard"))
            .with(Route::protected("/records", "RecordList"))
            .with(Route::protected("/records/:id", "RecordDetail"))
            .with(Route::protected("/models", "ModelList"))
            .with(Route::protected("/analysis", "AnalysisPCA"))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute<'_>> {
        let bare = path.split(['?', '#']).next().unwrap_or_default();
        self.routes.iter().find_map(|route| {
            route.matches(bare).map(|params| ResolvedRoute {
                route,
                path: path.to_string(),
                params,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_static_and_params() {
        let table = RouteTable::default_routes();

        let login = table.resolve("/login").unwrap();
        assert_eq!(login.route.name.as_deref(), Some("Login"));
        assert!(!login.route.requires_auth);

        let detail = table.resolve("/records/42?tab=raw").unwrap();
        assert_eq!(detail.route.name.as_deref(), Some("RecordDetail"));
        assert_eq!(detail.params.get("id").map(String::as_str), Some("42"));
        assert_eq!(detail.path, "/records/42?tab=raw");
        assert!(detail.route.requires_auth);
    }

    #[test]
    fn test_trailing_slash_and_root() {
        let table = RouteTable::default_routes();
        assert_eq!(
            table.resolve("/records/").unwrap().route.name.as_deref(),
            Some("RecordList")
        );
        assert_eq!(
            table.resolve("/").unwrap().route.redirect.as_deref(),
            Some("/dashboard")
        );
    }

    #[test]
    fn test_unknown_path() {
        let table = RouteTable::default_routes();
        assert!(table.resolve("/records/1/edit").is_none());
        assert!(table.resolve("/nope").is_none());
    }
}
