use async_trait::async_trait;
use futures::AsyncReadExt as _;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::{AttachParams, ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{ClusterExecError, ClusterQueryError, ConnectionSetupError};
use crate::model::split_lines;

/// One remote command invocation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ExecRequest<'a> {
    pub command: &'a str,
    pub container: &'a str,
    pub pod: &'a str,
    pub namespace: &'a str,
    pub stdin: Option<&'a str>,
}

/// Captured output is kept even when `error` is set.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub error: Option<ClusterExecError>,
}

impl ExecOutcome {
    pub fn failed(error: ClusterExecError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Read-only view of the cluster plus one-shot command execution.
///
/// Calls are awaited inline by the event loop, so at most one is in flight.
#[async_trait]
pub trait ResourceGateway: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterQueryError>;

    async fn list_pods(&self, namespace: &str) -> Result<Vec<String>, ClusterQueryError>;

    async fn list_containers(
        &self,
        namespace: &str,
        pod: &str,
    ) -> Result<Vec<String>, ClusterQueryError>;

    /// An empty `container` selects the pod's default container.
    async fn fetch_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
    ) -> Result<Vec<String>, ClusterQueryError>;

    async fn exec(&self, request: ExecRequest<'_>) -> ExecOutcome;
}

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    log_tail_lines: Option<i64>,
}

impl KubeGateway {
    pub async fn connect(
        kubeconfig_path: Option<&Path>,
        context: Option<String>,
    ) -> Result<Self, ConnectionSetupError> {
        let kubeconfig = match kubeconfig_path {
            Some(path) => Some(Kubeconfig::read_from(path).map_err(|error| {
                ConnectionSetupError::Kubeconfig {
                    path: path.display().to_string(),
                    reason: error.to_string(),
                }
            })?),
            None => Kubeconfig::read().ok(),
        };

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .map_err(|error| ConnectionSetupError::Infer(error.to_string()))?
        } else {
            if context.is_some() {
                return Err(ConnectionSetupError::Infer(
                    "kubeconfig not found; --context cannot be applied".to_string(),
                ));
            }
            Config::infer()
                .await
                .map_err(|error| ConnectionSetupError::Infer(error.to_string()))?
        };

        let cluster = config.cluster_url.to_string();
        let client =
            Client::try_from(config).map_err(|error| ConnectionSetupError::Client(error.to_string()))?;

        let context = context
            .or_else(|| kubeconfig.and_then(|cfg| cfg.current_context))
            .unwrap_or_else(|| "in-cluster".to_string());

        Ok(Self {
            client,
            context,
            cluster,
            log_tail_lines: None,
        })
    }

    pub fn with_log_tail_lines(mut self, tail_lines: Option<i64>) -> Self {
        self.log_tail_lines = tail_lines;
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }
}

#[async_trait]
impl ResourceGateway for KubeGateway {
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterQueryError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list(&ListParams::default())
            .await
            .map_err(|error| ClusterQueryError::new("failed to list namespaces", error))?;

        Ok(list.into_iter().map(|namespace| namespace.name_any()).collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<String>, ClusterQueryError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods.list(&ListParams::default()).await.map_err(|error| {
            ClusterQueryError::new(format!("failed to list pods in {namespace}"), error)
        })?;

        Ok(list.into_iter().map(|pod| pod.name_any()).collect())
    }

    async fn list_containers(
        &self,
        namespace: &str,
        pod: &str,
    ) -> Result<Vec<String>, ClusterQueryError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod_object = pods.get(pod).await.map_err(|error| {
            ClusterQueryError::new(format!("failed to fetch pod {namespace}/{pod}"), error)
        })?;

        Ok(pod_object
            .spec
            .map(|spec| {
                spec.containers
                    .into_iter()
                    .map(|container| container.name)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default())
    }

    async fn fetch_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
    ) -> Result<Vec<String>, ClusterQueryError> {
        let operation = format!("failed to load logs for {namespace}/{pod}");
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: Some(container.to_string()).filter(|name| !name.is_empty()),
            tail_lines: self.log_tail_lines,
            ..LogParams::default()
        };

        let stream = pods
            .log_stream(pod, &params)
            .await
            .map_err(|error| ClusterQueryError::new(operation.clone(), error))?;

        // The stream is released when it drops at the end of this block, whatever the read did.
        let body = {
            let mut stream = Box::pin(stream);
            let mut body = Vec::new();
            stream.read_to_end(&mut body).await.map(|_| body)
        };
        let body = body.map_err(|error| ClusterQueryError::new(operation, error))?;

        debug!(namespace, pod, container, bytes = body.len(), "log stream read");
        Ok(split_lines(&String::from_utf8_lossy(&body)))
    }

    async fn exec(&self, request: ExecRequest<'_>) -> ExecOutcome {
        let argv = tokenize_command(request.command);
        if argv.is_empty() {
            return ExecOutcome::failed(ClusterExecError::EmptyCommand);
        }

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), request.namespace);
        let params = AttachParams {
            container: Some(request.container.to_string()).filter(|name| !name.is_empty()),
            stdin: request.stdin.is_some(),
            stdout: true,
            stderr: true,
            tty: false,
            ..Default::default()
        };

        debug!(
            namespace = request.namespace,
            pod = request.pod,
            container = request.container,
            argv = ?argv,
            "opening exec stream"
        );
        let mut attached = match pods.exec(request.pod, argv, &params).await {
            Ok(attached) => attached,
            Err(error) => return ExecOutcome::failed(ClusterExecError::Connect(error.to_string())),
        };

        let mut error = None;
        if let Some(input) = request.stdin
            && let Some(mut writer) = attached.stdin()
        {
            let written = match writer.write_all(input.as_bytes()).await {
                Ok(()) => writer.shutdown().await,
                Err(error) => Err(error),
            };
            if let Err(write_error) = written {
                error = Some(ClusterExecError::Stdin(write_error.to_string()));
            }
        }

        let status = attached.take_status();
        let mut outcome =
            collect_exec_output(attached.stdout(), attached.stderr(), status, error).await;

        if let Err(join_error) = attached.join().await {
            warn!("exec stream did not close cleanly: {join_error}");
            outcome
                .error
                .get_or_insert(ClusterExecError::Remote(join_error.to_string()));
        }

        outcome
    }
}

/// Drains stdout and stderr together, then folds in the remote exit status.
///
/// Each channel has a small bounded buffer, so reading them one after the other can stall
/// the remote side on the unread one.
async fn collect_exec_output<O, E, S>(
    stdout: Option<O>,
    stderr: Option<E>,
    status: Option<S>,
    mut error: Option<ClusterExecError>,
) -> ExecOutcome
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
    S: Future<Output = Option<Status>>,
{
    let ((stdout, stdout_error), (stderr, stderr_error)) =
        tokio::join!(read_channel(stdout), read_channel(stderr));
    if let Some(reason) = stdout_error {
        error.get_or_insert(ClusterExecError::Stream {
            stream: "stdout",
            reason,
        });
    }
    if let Some(reason) = stderr_error {
        error.get_or_insert(ClusterExecError::Stream {
            stream: "stderr",
            reason,
        });
    }

    let status = match status {
        Some(status) => status.await,
        None => None,
    };
    if let Some(status) = status
        && status.status.as_deref() == Some("Failure")
    {
        let message = status
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "remote command failed".to_string());
        error.get_or_insert(ClusterExecError::Remote(message));
    }

    ExecOutcome {
        stdout,
        stderr,
        error,
    }
}

/// Whatever was read before a failure is kept alongside the failure.
async fn read_channel<R>(reader: Option<R>) -> (String, Option<String>)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return (String::new(), None);
    };

    let mut buffer = Vec::new();
    let failure = reader
        .read_to_end(&mut buffer)
        .await
        .err()
        .map(|error| error.to_string());
    (String::from_utf8_lossy(&buffer).into_owned(), failure)
}

/// Splits a command line on whitespace. No quoting rules apply.
pub fn tokenize_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
