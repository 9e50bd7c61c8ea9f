use crate::http::error::RouteError;
use crate::http::handler::{self, HandlerFunc};
use crate::http::request::RequestContext;
use crate::http::response::ResponseWriter;
use std::collections::HashMap;
use std::str::FromStr;

/// `"VERB /a/{b}/c"` split into its method and `/`-separated segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    method: String,
    segments: Vec<String>,
}

impl FromStr for Pattern {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(' ').collect();
        match parts[..] {
            [method, path, ..] => Ok(Pattern {
                method: method.to_string(),
                segments: path.split('/').map(String::from).collect(),
            }),
            _ => Err(RouteError::Malformed(s.to_string())),
        }
    }
}

fn wildcard_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
}

impl Pattern {
    /// Matches `target` against this pattern and returns the wildcard
    /// captures. Segment counts must be equal; a wildcard stands for exactly
    /// one segment.
    pub fn captures(&self, target: &Pattern) -> Option<HashMap<String, String>> {
        if self.method != target.method || self.segments.len() != target.segments.len() {
            return None;
        }

        let mut vars = HashMap::new();
        for (own, other) in self.segments.iter().zip(&target.segments) {
            if let Some(name) = wildcard_name(own) {
                vars.insert(name.to_string(), other.clone());
            } else if own != other {
                return None;
            }
        }
        Some(vars)
    }
}

pub struct Registration {
    pattern: Pattern,
    pub f: HandlerFunc,
}

/// The handler chosen for a request and what its wildcards matched.
pub struct Route<'r> {
    pub handler: &'r HandlerFunc,
    pub vars: HashMap<String, String>,
}

/// Ordered routing table. The first registration that matches wins; misses
/// go to the not-found handler given at construction.
pub struct Router {
    registrations: Vec<Registration>,
    not_found: HandlerFunc,
}

impl Default for Router {
    fn default() -> Self {
        Router::new(Box::new(handler::not_found))
    }
}

impl Router {
    pub fn new(not_found: HandlerFunc) -> Router {
        Router {
            registrations: Vec::new(),
            not_found,
        }
    }

    pub fn register<F>(&mut self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext<'_>, &mut dyn ResponseWriter) -> anyhow::Result<()>
            + Sync
            + Send
            + 'static,
    {
        let pattern = pattern.parse()?;
        self.registrations.push(Registration {
            pattern,
            f: Box::new(f),
        });
        Ok(())
    }

    pub fn resolve(&self, method: &str, path: &str) -> Route<'_> {
        let Ok(target) = format!("{} {}", method, path).parse::<Pattern>() else {
            return self.miss();
        };

        self.registrations
            .iter()
            .find_map(|r| {
                r.pattern.captures(&target).map(|vars| Route {
                    handler: &r.f,
                    vars,
                })
            })
            .unwrap_or_else(|| self.miss())
    }

    fn miss(&self) -> Route<'_> {
        Route {
            handler: &self.not_found,
            vars: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }
}
