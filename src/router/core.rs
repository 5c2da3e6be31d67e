use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashSet;
use tracing::{debug, info};

/// Maximum number of positional parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Positional action parameters, stack-allocated for ≤8 entries.
pub type ParamVec = SmallVec<[String; MAX_INLINE_PARAMS]>;

/// Outcome of routing one URI.
///
/// Produced once per dispatch cycle and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedRoute {
    /// Module to load before dispatch, if any
    pub module_name: Option<String>,
    /// Controller name as it appears in the URI (e.g. `users`)
    pub controller_name: String,
    /// Action name as it appears in the URI (e.g. `edit`)
    pub action_name: String,
    /// Parameters bound positionally to the action
    pub params: ParamVec,
}

impl ResolvedRoute {
    /// Get a positional parameter.
    #[inline]
    #[must_use]
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

/// Resolves URIs into routes.
pub trait Router: Send + Sync {
    /// Resolve `uri`. `None` stands for the site root.
    fn handle(&self, uri: Option<&str>) -> ResolvedRoute;
}

/// Where an explicit route dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub module: Option<String>,
    pub controller: String,
    pub action: String,
}

impl RouteTarget {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: None,
            controller: controller.into(),
            action: action.into(),
        }
    }

    #[must_use]
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

struct CompiledRoute {
    pattern: String,
    regex: Regex,
    param_names: Vec<String>,
    target: RouteTarget,
}

/// Router with explicit patterns and a conventional fallback.
pub struct PatternRouter {
    routes: Vec<CompiledRoute>,
    modules: HashSet<String>,
    default_module: Option<String>,
    default_controller: String,
    default_action: String,
}

impl Default for PatternRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRouter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            modules: HashSet::new(),
            default_module: None,
            default_controller: "index".to_string(),
            default_action: "index".to_string(),
        }
    }

    /// Register an explicit route. Routes are tried in registration order.
    pub fn add(&mut self, pattern: &str, target: RouteTarget) -> Result<&mut Self, regex::Error> {
        let (regex, param_names) = Self::path_to_regex(pattern)?;
        debug!(
            pattern = %pattern,
            controller = %target.controller,
            action = %target.action,
            "Route added"
        );
        self.routes.push(CompiledRoute {
            pattern: pattern.to_string(),
            regex,
            param_names,
            target,
        });
        Ok(self)
    }

    /// Declare a module name so the conventional fallback recognises it as a
    /// leading path segment.
    pub fn with_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.modules.insert(name.into());
        self
    }

    /// Module used when the URI does not name one.
    pub fn set_default_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.default_module = Some(name.into());
        self
    }

    pub fn set_default_controller(&mut self, name: impl Into<String>) -> &mut Self {
        self.default_controller = name.into();
        self
    }

    pub fn set_default_action(&mut self, name: impl Into<String>) -> &mut Self {
        self.default_action = name.into();
        self
    }

    /// Registered explicit patterns, in match order.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.pattern.as_str()).collect()
    }

    /// Log the routing table.
    pub fn dump_routes(&self) {
        let routes_summary: Vec<String> = self
            .routes
            .iter()
            .take(10)
            .map(|r| format!("{} -> {}#{}", r.pattern, r.target.controller, r.target.action))
            .collect();
        info!(
            routes_count = self.routes.len(),
            modules = ?self.modules,
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
    }

    /// Strip the query string and fragment, collapse the trailing slash.
    fn normalize(uri: Option<&str>) -> &str {
        let uri = uri.unwrap_or("/");
        let end = uri.find(['?', '#']).unwrap_or(uri.len());
        let path = uri[..end].trim_end_matches('/');
        if path.is_empty() {
            "/"
        } else {
            path
        }
    }

    fn match_explicit(&self, path: &str) -> Option<ResolvedRoute> {
        for route in &self.routes {
            let Some(caps) = route.regex.captures(path) else {
                continue;
            };
            let mut resolved = ResolvedRoute {
                module_name: route
                    .target
                    .module
                    .clone()
                    .or_else(|| self.default_module.clone()),
                controller_name: route.target.controller.clone(),
                action_name: route.target.action.clone(),
                params: ParamVec::new(),
            };
            for (i, name) in route.param_names.iter().enumerate() {
                let value = caps
                    .get(i + 1)
                    .map(|m| decode_segment(m.as_str()))
                    .unwrap_or_default();
                match name.as_str() {
                    "module" => resolved.module_name = Some(value),
                    "controller" => resolved.controller_name = value,
                    "action" => resolved.action_name = value,
                    _ => resolved.params.push(value),
                }
            }
            return Some(resolved);
        }
        None
    }

    fn match_conventional(&self, path: &str) -> ResolvedRoute {
        let mut segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_segment)
            .peekable();

        let module_name = match segments.peek() {
            Some(first) if self.modules.contains(first) => segments.next(),
            _ => self.default_module.clone(),
        };
        let controller_name = segments
            .next()
            .unwrap_or_else(|| self.default_controller.clone());
        let action_name = segments
            .next()
            .unwrap_or_else(|| self.default_action.clone());

        ResolvedRoute {
            module_name,
            controller_name,
            action_name,
            params: segments.collect(),
        }
    }

    /// Convert a route pattern into a regex and its placeholder names.
    ///
    /// ```rust,ignore
    /// let (regex, params) = PatternRouter::path_to_regex("/users/{id}")?;
    /// assert_eq!(params, vec!["id"]);
    /// assert!(regex.is_match("/users/123"));
    /// ```
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), regex::Error> {
        if path == "/" {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') {
                let param_name = segment
                    .trim_start_matches('{')
                    .trim_end_matches('}')
                    .to_string();
                pattern.push_str("/([^/]+)");
                param_names.push(param_name);
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}

impl Router for PatternRouter {
    fn handle(&self, uri: Option<&str>) -> ResolvedRoute {
        let path = Self::normalize(uri);
        let resolved = self
            .match_explicit(path)
            .unwrap_or_else(|| self.match_conventional(path));
        debug!(
            path = %path,
            module = resolved.module_name.as_deref().unwrap_or(""),
            controller = %resolved.controller_name,
            action = %resolved.action_name,
            params = resolved.params.len(),
            "Route resolved"
        );
        resolved
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
