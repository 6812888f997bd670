use chrono::{DateTime, Local};
use std::fmt::{Display, Formatter};

use crate::error::{ClusterExecError, ClusterQueryError};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Depth {
    Namespaces,
    Pods,
    Containers,
    Logs,
    ExecInput,
    ExecOutput,
}

impl Depth {
    pub fn title(self) -> &'static str {
        match self {
            Self::Namespaces => "Namespaces",
            Self::Pods => "Pods",
            Self::Containers => "Containers",
            Self::Logs => "Logs",
            Self::ExecInput => "Exec",
            Self::ExecOutput => "Output",
        }
    }

    pub fn is_exec(self) -> bool {
        matches!(self, Self::ExecInput | Self::ExecOutput)
    }

    /// Where `Back` lands. Both exec sub-states return straight to the container list.
    pub fn back_target(self) -> Option<Self> {
        match self {
            Self::Namespaces => None,
            Self::Pods => Some(Self::Namespaces),
            Self::Containers => Some(Self::Pods),
            Self::Logs => Some(Self::Containers),
            Self::ExecInput | Self::ExecOutput => Some(Self::Containers),
        }
    }

    /// The listing shown at this depth, if the depth owns one.
    pub fn listing_kind(self) -> Option<ListingKind> {
        match self {
            Self::Namespaces => Some(ListingKind::Namespaces),
            Self::Pods => Some(ListingKind::Pods),
            Self::Containers => Some(ListingKind::Containers),
            Self::Logs => Some(ListingKind::Logs),
            Self::ExecInput => None,
            Self::ExecOutput => Some(ListingKind::ExecOutput),
        }
    }
}

impl Display for Depth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NavigationContext {
    pub namespace: Option<String>,
    pub pod: Option<String>,
    pub container: Option<String>,
}

impl NavigationContext {
    /// Whether every selection the depth depends on has been made.
    pub fn satisfies(&self, depth: Depth) -> bool {
        let namespace = self.namespace.is_some();
        let pod = self.pod.is_some();
        let container = self.container.is_some();
        match depth {
            Depth::Namespaces => true,
            Depth::Pods => namespace,
            Depth::Containers => namespace && pod,
            Depth::Logs | Depth::ExecInput | Depth::ExecOutput => namespace && pod && container,
        }
    }

    pub fn breadcrumb(&self) -> String {
        let parts = [&self.namespace, &self.pod, &self.container]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>();
        if parts.is_empty() {
            "-".to_string()
        } else {
            parts.join(" / ")
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Item {
    Label(String),
    ErrorPlaceholder(String),
}

impl Item {
    pub fn text(&self) -> &str {
        match self {
            Self::Label(text) | Self::ErrorPlaceholder(text) => text,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::ErrorPlaceholder(_))
    }

    pub fn matches_filter(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }

        self.text()
            .to_ascii_lowercase()
            .contains(&query.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ListingKind {
    Namespaces,
    Pods,
    Containers,
    Logs,
    ExecOutput,
}

impl ListingKind {
    pub fn depth(self) -> Depth {
        match self {
            Self::Namespaces => Depth::Namespaces,
            Self::Pods => Depth::Pods,
            Self::Containers => Depth::Containers,
            Self::Logs => Depth::Logs,
            Self::ExecOutput => Depth::ExecOutput,
        }
    }

    /// Container lookups fold their failure into the item list so the view is never blank.
    /// Every other listing reports failures through the view's error panel.
    pub fn degrade_to_pseudo_item(self) -> bool {
        matches!(self, Self::Containers)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Listing {
    pub items: Vec<Item>,
    pub error: Option<String>,
    pub fetched_at: Option<DateTime<Local>>,
}

impl Listing {
    pub fn from_query(
        kind: ListingKind,
        result: Result<Vec<String>, ClusterQueryError>,
        fetched_at: DateTime<Local>,
    ) -> Self {
        let mut listing = Self::default();
        match result {
            Ok(labels) => listing.set_labels(labels, fetched_at),
            Err(error) if kind.degrade_to_pseudo_item() => {
                listing.items = vec![Item::ErrorPlaceholder(error.to_string())];
                listing.fetched_at = Some(fetched_at);
            }
            Err(error) => listing.set_error(error.to_string(), fetched_at),
        }
        listing
    }

    pub fn set_labels(&mut self, labels: Vec<String>, fetched_at: DateTime<Local>) {
        self.items = labels.into_iter().map(Item::Label).collect();
        self.error = None;
        self.fetched_at = Some(fetched_at);
    }

    pub fn set_error(&mut self, error: impl Into<String>, fetched_at: DateTime<Local>) {
        self.items.clear();
        self.error = Some(error.into());
        self.fetched_at = Some(fetched_at);
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ExecSession {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
}

impl ExecSession {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Splits a body on `\n` without trimming. An empty body has no lines.
pub fn split_lines(body: &str) -> Vec<String> {
    if body.is_empty() {
        return Vec::new();
    }

    body.split('\n').map(str::to_string).collect()
}

/// Exec output is normalised from CRLF before splitting.
pub fn split_exec_output(stdout: &str) -> Vec<String> {
    split_lines(&stdout.replace("\r\n", "\n"))
}

pub fn format_exec_error(
    namespace: &str,
    pod: &str,
    container: &str,
    command: &str,
    error: &ClusterExecError,
) -> String {
    format!(
        "Error occurred while exec'ing into pod {pod:?}, container {container:?}, namespace {namespace:?}, command {command:?}: {error}"
    )
}

#[cfg(test)]
mod tests {
    use super::{
        Depth, Item, Listing, ListingKind, NavigationContext, split_exec_output, split_lines,
    };
    use crate::error::ClusterQueryError;
    use chrono::Local;

    #[test]
    fn back_targets_follow_the_hierarchy() {
        assert_eq!(Depth::Namespaces.back_target(), None);
        assert_eq!(Depth::Pods.back_target(), Some(Depth::Namespaces));
        assert_eq!(Depth::Containers.back_target(), Some(Depth::Pods));
        assert_eq!(Depth::Logs.back_target(), Some(Depth::Containers));
        assert_eq!(Depth::ExecInput.back_target(), Some(Depth::Containers));
        assert_eq!(Depth::ExecOutput.back_target(), Some(Depth::Containers));
    }

    #[test]
    fn depths_are_ordered_by_drill_down() {
        assert!(Depth::Namespaces < Depth::Pods);
        assert!(Depth::Pods < Depth::Logs);
        assert!(Depth::Logs < Depth::ExecInput);
    }

    #[test]
    fn only_container_listing_degrades_to_pseudo_item() {
        assert!(ListingKind::Containers.degrade_to_pseudo_item());
        for kind in [
            ListingKind::Namespaces,
            ListingKind::Pods,
            ListingKind::Logs,
            ListingKind::ExecOutput,
        ] {
            assert!(!kind.degrade_to_pseudo_item(), "{kind:?}");
        }
    }

    #[test]
    fn container_failure_becomes_single_placeholder_item() {
        let error = ClusterQueryError::new("get pod n/p", "pods \"p\" not found");
        let listing = Listing::from_query(ListingKind::Containers, Err(error.clone()), Local::now());
        assert_eq!(listing.items, vec![Item::ErrorPlaceholder(error.to_string())]);
        assert_eq!(listing.error, None);
    }

    #[test]
    fn pod_failure_goes_to_error_panel() {
        let error = ClusterQueryError::new("list pods in n", "forbidden");
        let listing = Listing::from_query(ListingKind::Pods, Err(error), Local::now());
        assert!(listing.items.is_empty());
        assert_eq!(listing.error.as_deref(), Some("list pods in n: forbidden"));
    }

    #[test]
    fn split_keeps_trailing_empty_line() {
        assert_eq!(split_lines("hi\n"), vec!["hi".to_string(), String::new()]);
        assert_eq!(split_lines("hi"), vec!["hi".to_string()]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn exec_output_collapses_crlf() {
        assert_eq!(split_exec_output("a\r\nb\r\nc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn context_requirements_per_depth() {
        let mut context = NavigationContext::default();
        assert!(context.satisfies(Depth::Namespaces));
        assert!(!context.satisfies(Depth::Pods));

        context.namespace = Some("n".to_string());
        context.pod = Some("p".to_string());
        assert!(context.satisfies(Depth::Containers));
        assert!(!context.satisfies(Depth::Logs));
        assert_eq!(context.breadcrumb(), "n / p");
    }

    #[test]
    fn filter_is_case_insensitive() {
        let item = Item::Label("Kube-System".to_string());
        assert!(item.matches_filter("system"));
        assert!(item.matches_filter("  "));
        assert!(!item.matches_filter("default"));
    }
}
