use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubenav",
    version,
    about = "Browse namespaces, pods, containers and logs, and run one-shot commands in containers."
)]
pub struct CliArgs {
    /// Kubeconfig file to use instead of the default discovery
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to connect with
    #[arg(long)]
    pub context: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append logs to this file; logs are discarded otherwise
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Runtime config file, overriding discovery
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn defaults_without_flags() {
        let args = CliArgs::parse_from(["kubenav"]);
        assert_eq!(args.log_filter, "info");
        assert_eq!(args.kubeconfig, None);
        assert_eq!(args.context, None);
        assert_eq!(args.log_file, None);
    }

    #[test]
    fn parses_connection_flags() {
        let args = CliArgs::parse_from([
            "kubenav",
            "--kubeconfig",
            "/tmp/kc.yaml",
            "--context",
            "staging",
            "--log-file",
            "/tmp/kubenav.log",
        ]);
        assert_eq!(args.kubeconfig, Some(PathBuf::from("/tmp/kc.yaml")));
        assert_eq!(args.context.as_deref(), Some("staging"));
        assert_eq!(args.log_file, Some(PathBuf::from("/tmp/kubenav.log")));
    }
}
