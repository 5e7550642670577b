//! route to policy lookup.

use std::collections::HashMap;

use gatehouse_types::normalize_route;

/// static mapping from route key to the policies that may access it.
#[derive(Debug, Clone, Default)]
pub struct PolicyResolver {
    routes: HashMap<String, Vec<String>>,
}

impl PolicyResolver {
    /// build a resolver; route keys are normalized on the way in.
    pub fn new<I, K>(routes: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let routes = routes
            .into_iter()
            .map(|(route, policies)| (normalize_route(route.as_ref()).to_string(), policies))
            .collect();
        Self { routes }
    }

    /// policies required for `route`, or `None` if the route has none.
    pub fn policies_for(&self, route: &str) -> Option<&[String]> {
        self.routes
            .get(normalize_route(route))
            .map(Vec::as_slice)
            .filter(|policies| !policies.is_empty())
    }

    /// number of configured routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// true if no routes are configured.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
