//! Route table construction and lookup.
//!
//! # Responsibilities
//! - Compose the standard and debug route sets from configuration
//! - Resolve every descriptor against the API prefix and its backend
//! - Reject duplicate `(method, path)` registrations at build time
//! - Look up the route for a request, or report an explicit miss
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - Placeholder names are erased before the duplicate check
//! - First registered route wins among overlapping patterns

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::config::{ServerConfig, ServicesConfig};
use crate::routing::endpoints::{
    self, LocalHandler, Mount, RouteDescriptor, RouteSet, Service, TargetSpec, Visibility,
};
use crate::routing::matcher::PathPattern;
use crate::routing::template::{PathParams, TemplateError, UrlTemplate};

/// Errors that make a route table unusable. Fatal at startup.
#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("route {method} {path} is registered more than once")]
    DuplicateRoute { method: Method, path: String },

    #[error("invalid route template: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid base URL for {service}: {reason}")]
    InvalidBackend { service: &'static str, reason: String },

    #[error("api spec file path `{0}` has no file name")]
    InvalidSpecFile(String),
}

/// A backend path that cannot be turned into a URL on its backend.
#[derive(Debug, Error)]
pub enum BackendUrlError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    #[error("`{path}` resolves outside the {service} base URL")]
    OutsideBase { service: &'static str, path: String },
}

/// A backend service and the base URL requests are forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub service: Service,
    pub base_url: Url,
}

impl BackendTarget {
    /// Parse a base URL. A missing trailing `/` is added so relative paths
    /// are appended rather than replacing the last segment.
    pub fn new(service: Service, base: &str) -> Result<Self, RouteTableError> {
        let invalid = |reason: String| RouteTableError::InvalidBackend {
            service: service.name(),
            reason,
        };
        let mut base_url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("URL cannot be a base".to_string()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { service, base_url })
    }

    pub fn name(&self) -> &'static str {
        self.service.name()
    }

    /// Absolute URL of `relative_path` (no leading `/`) on this backend.
    ///
    /// The result always stays under the base URL.
    pub fn url_for(&self, relative_path: &str, query: Option<&str>) -> Result<Url, BackendUrlError> {
        let mut url = self.base_url.join(relative_path.trim_start_matches('/'))?;
        if url.origin() != self.base_url.origin() || !url.path().starts_with(self.base_url.path()) {
            return Err(BackendUrlError::OutsideBase {
                service: self.name(),
                path: relative_path.to_string(),
            });
        }
        url.set_query(query);
        Ok(url)
    }
}

/// The two backends known to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTargets {
    pub aggregator: BackendTarget,
    pub content: BackendTarget,
}

impl BackendTargets {
    pub fn from_config(services: &ServicesConfig) -> Result<Self, RouteTableError> {
        Ok(Self {
            aggregator: BackendTarget::new(Service::Aggregator, &services.aggregator)?,
            content: BackendTarget::new(Service::Content, &services.content)?,
        })
    }

    pub fn get(&self, service: Service) -> &BackendTarget {
        match service {
            Service::Aggregator => &self.aggregator,
            Service::Content => &self.content,
        }
    }
}

/// Where a resolved route sends matched requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local(LocalHandler),
    Proxied(Arc<BackendTarget>),
}

/// A fully resolved route.
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: PathPattern,
    /// Path on the backend, relative to its base URL.
    pub backend_template: UrlTemplate,
    pub methods: Vec<Method>,
    pub target: Target,
    pub visibility: Visibility,
}

impl Route {
    /// Backend path for the given parameters.
    pub fn backend_path(&self, params: &PathParams) -> Result<String, TemplateError> {
        self.backend_template.render(params)
    }
}

/// Outcome of looking up a request.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched { route: &'a Route, params: PathParams },
    /// The path exists, but not for this method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// The immutable route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build the table for a server configuration.
    ///
    /// Debug routes are merged in only when `server.debug` is set.
    pub fn build(server: &ServerConfig, backends: &BackendTargets) -> Result<Self, RouteTableError> {
        let spec_file_name = Path::new(&server.api_spec_file)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RouteTableError::InvalidSpecFile(server.api_spec_file.clone()))?;

        let debug = if server.debug {
            endpoints::debug_routes()
        } else {
            RouteSet::empty()
        };
        let routes = endpoints::standard_routes(spec_file_name).merge(debug);

        Self::from_descriptors(&server.api_prefix, routes, backends)
    }

    /// Resolve descriptors into a table, failing on any duplicate.
    pub fn from_descriptors(
        api_prefix: &str,
        descriptors: RouteSet,
        backends: &BackendTargets,
    ) -> Result<Self, RouteTableError> {
        let aggregator = Arc::new(backends.aggregator.clone());
        let content = Arc::new(backends.content.clone());
        let mut seen: HashSet<(Method, String)> = HashSet::new();
        let mut routes = Vec::new();

        for descriptor in descriptors {
            let RouteDescriptor {
                template,
                methods,
                target,
                visibility,
                mount,
            } = descriptor;

            let full_path = match mount {
                Mount::Api => format!("{api_prefix}{template}"),
                Mount::Root => format!("/{template}"),
            };
            let pattern = PathPattern::compile(&full_path)?;
            let backend_template = UrlTemplate::parse(&template)?;

            for method in &methods {
                let key = (method.clone(), pattern.normalized());
                if !seen.insert(key) {
                    return Err(RouteTableError::DuplicateRoute {
                        method: method.clone(),
                        path: full_path,
                    });
                }
            }

            let target = match target {
                TargetSpec::Local(handler) => Target::Local(handler),
                TargetSpec::Proxied(Service::Aggregator) => Target::Proxied(aggregator.clone()),
                TargetSpec::Proxied(Service::Content) => Target::Proxied(content.clone()),
            };

            tracing::debug!(
                path = %pattern,
                methods = ?methods,
                visibility = ?visibility,
                "Route registered"
            );

            routes.push(Route {
                pattern,
                backend_template,
                methods,
                target,
                visibility,
            });
        }

        Ok(Self { routes })
    }

    /// Look up the route for a request.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let mut allowed = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.match_path(path) else {
                continue;
            };
            if route.methods.contains(method) {
                return Resolution::Matched { route, params };
            }
            for m in &route.methods {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
