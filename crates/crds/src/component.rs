//! Managed stack components.
//!
//! An `EFKStack` always manages exactly three components, deployed in a fixed
//! dependency order: the search engine first, then the log shipper, then the
//! dashboard.

use std::fmt;

/// Label carried by every object a release renders.
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";

/// One of the three managed sub-systems of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Elasticsearch
    SearchEngine,
    /// Fluent Bit
    LogShipper,
    /// Kibana
    Dashboard,
}

impl Component {
    /// All components in reconciliation order.
    pub const ALL: [Component; 3] = [
        Component::SearchEngine,
        Component::LogShipper,
        Component::Dashboard,
    ];

    /// Suffix appended to the stack name to form the release name.
    #[must_use]
    pub fn release_suffix(self) -> &'static str {
        match self {
            Component::SearchEngine => "searchengine",
            Component::LogShipper => "logshipper",
            Component::Dashboard => "dashboard",
        }
    }

    /// Release name for this component of the named stack, e.g. `logs-searchengine`.
    ///
    /// This is also the value of the `app.kubernetes.io/instance` label on
    /// every object the release renders.
    #[must_use]
    pub fn release_name(self, stack_name: &str) -> String {
        format!("{}-{}", stack_name, self.release_suffix())
    }

    /// Chart directory name under the configured chart root.
    #[must_use]
    pub fn chart_name(self) -> &'static str {
        match self {
            Component::SearchEngine => "elasticsearch",
            Component::LogShipper => "fluentbit",
            Component::Dashboard => "kibana",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::SearchEngine => "SearchEngine",
            Component::LogShipper => "LogShipper",
            Component::Dashboard => "Dashboard",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_names_follow_convention() {
        assert_eq!(Component::SearchEngine.release_name("logs"), "logs-searchengine");
        assert_eq!(Component::LogShipper.release_name("logs"), "logs-logshipper");
        assert_eq!(Component::Dashboard.release_name("logs"), "logs-dashboard");
    }

    #[test]
    fn test_search_engine_is_reconciled_first() {
        assert_eq!(Component::ALL[0], Component::SearchEngine);
    }
}
