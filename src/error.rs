/// A listing or log fetch against the cluster API failed.
///
/// Shown as the content of the view that requested it; navigation is otherwise unaffected.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("{operation}: {reason}")]
pub struct ClusterQueryError {
    pub operation: String,
    pub reason: String,
}

impl ClusterQueryError {
    pub fn new(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

/// A remote command could not be run to completion.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ClusterExecError {
    #[error("command is empty")]
    EmptyCommand,
    #[error("failed to open exec stream: {0}")]
    Connect(String),
    #[error("failed to write stdin: {0}")]
    Stdin(String),
    #[error("failed to read {stream}: {reason}")]
    Stream { stream: &'static str, reason: String },
    #[error("{0}")]
    Remote(String),
}

/// Bootstrap failures. Fatal: the TUI never starts.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionSetupError {
    #[error("failed to read kubeconfig {path}: {reason}")]
    Kubeconfig { path: String, reason: String },
    #[error("failed to infer Kubernetes configuration: {0}")]
    Infer(String),
    #[error("failed to initialize Kubernetes client: {0}")]
    Client(String),
}
