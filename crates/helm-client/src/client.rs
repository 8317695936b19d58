//! Helm CLI client
//!
//! Runs the `helm` binary as a child process, feeding chart values as JSON
//! on stdin and reading release documents back with `--output json`.

use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::HelmError;
use crate::helm_trait::HelmClientTrait;
use crate::models::{ReleaseDocument, ReleaseHandle, ReleaseStatus, ReleaseSummary};

/// Timeout passed to `helm --timeout` for install, upgrade and uninstall.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Extra time given to the helm process on top of its own `--timeout`
/// before it is killed.
const PROCESS_GRACE: Duration = Duration::from_secs(30);

/// Helm client bound to one namespace
#[derive(Debug, Clone)]
pub struct HelmClient {
    helm_bin: String,
    namespace: String,
    timeout: Duration,
}

impl HelmClient {
    /// Create a new Helm client for `namespace`, using `helm` from `PATH`.
    pub fn new(namespace: impl Into<String>) -> Result<Self, HelmError> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(HelmError::InvalidRequest(
                "namespace must not be empty".to_string(),
            ));
        }

        Ok(Self {
            helm_bin: "helm".to_string(),
            namespace,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Use a specific helm binary.
    #[must_use]
    pub fn with_binary(mut self, helm_bin: impl Into<String>) -> Self {
        self.helm_bin = helm_bin.into();
        self
    }

    /// Override the operation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn timeout_arg(&self) -> String {
        format!("{}s", self.timeout.as_secs())
    }

    /// Runs `helm <command> <args> --namespace <ns>`, optionally writing `stdin`.
    async fn run(
        &self,
        command: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<Output, HelmError> {
        debug!("Running {} {} {:?} in namespace {}", self.helm_bin, command, args, self.namespace);

        let mut child = Command::new(&self.helm_bin)
            .arg(command)
            .args(args)
            .arg("--namespace")
            .arg(&self.namespace)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input).await?;
            // Dropping the pipe closes it so helm sees EOF.
            drop(pipe);
        }

        let output = match tokio::time::timeout(
            self.timeout + PROCESS_GRACE,
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_elapsed) => return Err(HelmError::Timeout(command.to_string())),
        };

        if output.status.success() {
            Ok(output)
        } else {
            Err(HelmError::Command {
                command: command.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl HelmError {
    /// True when helm reported that the release does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, HelmError::Command { stderr, .. } if stderr.contains("release: not found"))
    }
}

#[async_trait::async_trait]
impl HelmClientTrait for HelmClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn install_or_upgrade(
        &self,
        release: &str,
        chart: &str,
        values: &serde_json::Value,
    ) -> Result<ReleaseHandle, HelmError> {
        if release.is_empty() {
            return Err(HelmError::InvalidRequest(
                "release name must not be empty".to_string(),
            ));
        }

        let payload = serde_json::to_vec(values)?;
        let timeout = self.timeout_arg();
        // `upgrade --install` covers both the first install and later upgrades.
        let args = [
            release,
            chart,
            "--install",
            "--create-namespace",
            "--wait",
            "--wait-for-jobs",
            "--timeout",
            timeout.as_str(),
            "--values",
            "-",
            "--output",
            "json",
        ];

        let output = self.run("upgrade", &args, Some(&payload)).await?;
        let document: ReleaseDocument = serde_json::from_slice(&output.stdout)?;
        let handle = ReleaseHandle::from(document);

        info!(
            "Helm release {}/{} at revision {} ({})",
            self.namespace, release, handle.revision, handle.status
        );
        Ok(handle)
    }

    async fn release_status(&self, release: &str) -> Result<ReleaseStatus, HelmError> {
        match self.run("status", &[release, "--output", "json"], None).await {
            Ok(output) => {
                let document: ReleaseDocument = serde_json::from_slice(&output.stdout)?;
                Ok(ReleaseStatus::parse(&document.info.status))
            }
            Err(e) if e.is_not_found() => Ok(ReleaseStatus::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn uninstall(&self, release: &str) -> Result<(), HelmError> {
        let timeout = self.timeout_arg();
        match self
            .run("uninstall", &[release, "--wait", "--timeout", timeout.as_str()], None)
            .await
        {
            Ok(_) => {
                info!("Uninstalled Helm release {}/{}", self.namespace, release);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("Helm release {}/{} already absent", self.namespace, release);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn list_releases(&self) -> Result<Vec<ReleaseSummary>, HelmError> {
        let output = self.run("list", &["--all", "--output", "json"], None).await?;
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
