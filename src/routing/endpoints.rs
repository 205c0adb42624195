//! Declarative route descriptors.
//!
//! The public API is described as two disjoint sets: the standard routes,
//! always served, and the debug routes, served only in debug mode. Paths are
//! relative to the API prefix unless mounted at the server root.

use axum::http::Method;

/// Returns status ok.
pub const MAIN_ENDPOINT: &str = "";
/// Deletes all `{organizations}` (comma separated). Debug only.
pub const DELETE_ORGANIZATIONS_ENDPOINT: &str = "organizations/{organizations}";
/// Deletes all `{clusters}` (comma separated). Debug only.
pub const DELETE_CLUSTERS_ENDPOINT: &str = "clusters/{clusters}";
/// Lists all organizations. Debug only.
pub const ORGANIZATIONS_ENDPOINT: &str = "organizations";
/// Report for `{organization}` and `{cluster}`.
pub const REPORT_ENDPOINT: &str = "report/{organization}/{cluster}";
/// Like a rule for a cluster as the user from the auth header.
pub const LIKE_RULE_ENDPOINT: &str = "clusters/{cluster}/rules/{rule_id}/like";
/// Dislike a rule for a cluster as the user from the auth header.
pub const DISLIKE_RULE_ENDPOINT: &str = "clusters/{cluster}/rules/{rule_id}/dislike";
/// Reset the vote on a rule for a cluster.
pub const RESET_VOTE_ON_RULE_ENDPOINT: &str = "clusters/{cluster}/rules/{rule_id}/reset_vote";
/// Read the vote on a rule. Debug only.
pub const GET_VOTE_ON_RULE_ENDPOINT: &str = "clusters/{cluster}/rules/{rule_id}/get_vote";
/// Create and delete a rule. Debug only.
pub const RULE_ENDPOINT: &str = "rules/{rule_id}";
/// Read a rule error key; create and delete it in debug mode.
pub const RULE_ERROR_KEY_ENDPOINT: &str = "rules/{rule_id}/error_keys/{error_key}";
/// Rule groups, served by the content service.
pub const RULE_GROUPS_ENDPOINT: &str = "groups";
/// Clusters belonging to `{organization}`.
pub const CLUSTERS_FOR_ORGANIZATION_ENDPOINT: &str = "organizations/{organization}/clusters";
/// Disable a rule for a cluster.
pub const DISABLE_RULE_FOR_CLUSTER_ENDPOINT: &str = "clusters/{cluster}/rules/{rule_id}/disable";
/// Re-enable a rule for a cluster.
pub const ENABLE_RULE_FOR_CLUSTER_ENDPOINT: &str = "clusters/{cluster}/rules/{rule_id}/enable";
/// Prometheus metrics.
pub const METRICS_ENDPOINT: &str = "metrics";

/// Root of the profiling introspection sub-tree (root mount).
pub const PROFILING_INDEX_ENDPOINT: &str = "debug/pprof/";
pub const PROFILING_CMDLINE_ENDPOINT: &str = "debug/pprof/cmdline";
pub const PROFILING_RUNTIME_ENDPOINT: &str = "debug/pprof/runtime";

/// Backend services the gateway forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Aggregator,
    Content,
}

impl Service {
    pub fn name(self) -> &'static str {
        match self {
            Service::Aggregator => "aggregator",
            Service::Content => "content-service",
        }
    }
}

/// Handlers served by the gateway itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalHandler {
    Main,
    Metrics,
    ApiSpec,
    ProfilingIndex,
    ProfilingCmdline,
    ProfilingRuntime,
}

/// Where a descriptor sends matched requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSpec {
    Local(LocalHandler),
    Proxied(Service),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Standard,
    Debug,
}

/// Base a descriptor's path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount {
    /// Under the configured API prefix.
    Api,
    /// Under `/`, regardless of the API prefix.
    Root,
}

/// One row of the route table, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub template: String,
    pub methods: Vec<Method>,
    pub target: TargetSpec,
    pub visibility: Visibility,
    pub mount: Mount,
}

impl RouteDescriptor {
    fn new(template: impl Into<String>, methods: &[Method], target: TargetSpec, visibility: Visibility) -> Self {
        Self {
            template: template.into(),
            methods: methods.to_vec(),
            target,
            visibility,
            mount: Mount::Api,
        }
    }

    fn mounted_at_root(mut self) -> Self {
        self.mount = Mount::Root;
        self
    }
}

/// An ordered set of route descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSet {
    routes: Vec<RouteDescriptor>,
}

impl RouteSet {
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Concatenate two sets. Duplicates are detected by the table builder.
    pub fn merge(mut self, other: RouteSet) -> Self {
        self.routes.extend(other.routes);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl IntoIterator for RouteSet {
    type Item = RouteDescriptor;
    type IntoIter = std::vec::IntoIter<RouteDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.into_iter()
    }
}

/// Routes always exposed. `spec_file_name` is the base name of the OpenAPI
/// specification file, served under the API prefix.
pub fn standard_routes(spec_file_name: &str) -> RouteSet {
    use LocalHandler::*;
    use Service::*;
    use TargetSpec::*;
    use Visibility::Standard;

    let get = Method::GET;
    let put = Method::PUT;
    let options = Method::OPTIONS;

    RouteSet::new(vec![
        RouteDescriptor::new(MAIN_ENDPOINT, &[get.clone()], Local(Main), Standard),
        RouteDescriptor::new(REPORT_ENDPOINT, &[get.clone(), options.clone()], Proxied(Aggregator), Standard),
        RouteDescriptor::new(LIKE_RULE_ENDPOINT, &[put.clone(), options.clone()], Proxied(Aggregator), Standard),
        RouteDescriptor::new(DISLIKE_RULE_ENDPOINT, &[put.clone(), options.clone()], Proxied(Aggregator), Standard),
        RouteDescriptor::new(RESET_VOTE_ON_RULE_ENDPOINT, &[put.clone(), options.clone()], Proxied(Aggregator), Standard),
        RouteDescriptor::new(CLUSTERS_FOR_ORGANIZATION_ENDPOINT, &[get.clone()], Proxied(Aggregator), Standard),
        RouteDescriptor::new(DISABLE_RULE_FOR_CLUSTER_ENDPOINT, &[put.clone(), options.clone()], Proxied(Aggregator), Standard),
        RouteDescriptor::new(ENABLE_RULE_FOR_CLUSTER_ENDPOINT, &[put, options.clone()], Proxied(Aggregator), Standard),
        RouteDescriptor::new(RULE_GROUPS_ENDPOINT, &[get.clone(), options], Proxied(Content), Standard),
        RouteDescriptor::new(RULE_ERROR_KEY_ENDPOINT, &[get.clone()], Proxied(Aggregator), Standard),
        RouteDescriptor::new(METRICS_ENDPOINT, &[get.clone()], Local(Metrics), Standard),
        RouteDescriptor::new(spec_file_name, &[get], Local(ApiSpec), Standard),
    ])
}

/// Administrative and testing routes, exposed only in debug mode.
pub fn debug_routes() -> RouteSet {
    use LocalHandler::*;
    use Service::Aggregator;
    use TargetSpec::*;
    use Visibility::Debug;

    let get = Method::GET;
    let post = Method::POST;
    let delete = Method::DELETE;

    RouteSet::new(vec![
        RouteDescriptor::new(ORGANIZATIONS_ENDPOINT, &[get.clone()], Proxied(Aggregator), Debug),
        RouteDescriptor::new(DELETE_ORGANIZATIONS_ENDPOINT, &[delete.clone()], Proxied(Aggregator), Debug),
        RouteDescriptor::new(DELETE_CLUSTERS_ENDPOINT, &[delete.clone()], Proxied(Aggregator), Debug),
        RouteDescriptor::new(GET_VOTE_ON_RULE_ENDPOINT, &[get.clone()], Proxied(Aggregator), Debug),
        RouteDescriptor::new(RULE_ENDPOINT, &[post.clone(), delete.clone()], Proxied(Aggregator), Debug),
        RouteDescriptor::new(RULE_ERROR_KEY_ENDPOINT, &[post, delete], Proxied(Aggregator), Debug),
        RouteDescriptor::new(PROFILING_INDEX_ENDPOINT, &[get.clone()], Local(ProfilingIndex), Debug).mounted_at_root(),
        RouteDescriptor::new(PROFILING_CMDLINE_ENDPOINT, &[get.clone()], Local(ProfilingCmdline), Debug).mounted_at_root(),
        RouteDescriptor::new(PROFILING_RUNTIME_ENDPOINT, &[get], Local(ProfilingRuntime), Debug).mounted_at_root(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sets_are_tagged_consistently() {
        assert!(standard_routes("openapi.json").iter().all(|r| r.visibility == Visibility::Standard));
        assert!(debug_routes().iter().all(|r| r.visibility == Visibility::Debug));
    }

    #[test]
    fn test_spec_file_route_uses_given_name() {
        let routes = standard_routes("openapi.json");
        let spec = routes
            .iter()
            .find(|r| r.target == TargetSpec::Local(LocalHandler::ApiSpec))
            .unwrap();
        assert_eq!(spec.template, "openapi.json");
        assert_eq!(spec.mount, Mount::Api);
    }

    #[test]
    fn test_profiling_is_debug_only_and_root_mounted() {
        assert!(standard_routes("openapi.json").iter().all(|r| r.mount == Mount::Api));
        let profiling: Vec<_> = debug_routes().into_iter().filter(|r| r.mount == Mount::Root).collect();
        assert_eq!(profiling.len(), 3);
        assert!(profiling.iter().all(|r| r.template.starts_with("debug/pprof/")));
    }

    #[test]
    fn test_merge_keeps_order() {
        let merged = standard_routes("openapi.json").merge(debug_routes());
        assert_eq!(merged.len(), 12 + 9);
        assert_eq!(merged.iter().next().unwrap().template, MAIN_ENDPOINT);
        assert_eq!(merged.iter().last().unwrap().template, PROFILING_RUNTIME_ENDPOINT);
        assert!(RouteSet::empty().merge(RouteSet::empty()).is_empty());
    }
}
