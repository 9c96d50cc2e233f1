//! Container control through the Docker CLI.
//!
//! Only whitelisted services reach here, and every argument is built from the
//! service key, never from caller-supplied strings.

use std::process::Command;
use sui_types::{ContainerControl, ServiceKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockerError {
    #[error("service {service}: cannot run {program}: {source}")]
    Spawn {
        service: ServiceKey,
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("service {service}: {program} exited with {code:?}: {stderr}")]
    Failed {
        service: ServiceKey,
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn restart_args(service: ServiceKey) -> Vec<String> {
        vec!["restart".into(), service.container_name().into()]
    }

    pub fn inspect_args(service: ServiceKey) -> Vec<String> {
        vec![
            "inspect".into(),
            "-f".into(),
            "{{.State.Status}}".into(),
            service.container_name().into(),
        ]
    }

    pub fn logs_args(service: ServiceKey, lines: u32) -> Vec<String> {
        vec![
            "logs".into(),
            "--tail".into(),
            lines.to_string(),
            service.container_name().into(),
        ]
    }

    fn run(&self, service: ServiceKey, args: &[String]) -> Result<String, DockerError> {
        tracing::debug!(service = %service, program = %self.program, ?args, "docker call");
        let out = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| DockerError::Spawn {
                service,
                program: self.program.clone(),
                source,
            })?;
        if !out.status.success() {
            return Err(DockerError::Failed {
                service,
                program: self.program.clone(),
                code: out.status.code(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
        // docker logs writes the container's stderr stream to ours
        text.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(text)
    }
}

impl ContainerControl for DockerCli {
    type Error = DockerError;

    fn restart(&self, service: ServiceKey) -> Result<String, Self::Error> {
        self.run(service, &Self::restart_args(service))?;
        tracing::info!(service = %service, "container restarted");
        Ok(format!("{} restarted", service.container_name()))
    }

    /// Container state, `not_found` if docker knows no such container, or
    /// `unknown` if docker itself is unavailable.
    fn inspect_status(&self, service: ServiceKey) -> String {
        match self.run(service, &Self::inspect_args(service)) {
            Ok(out) => out.trim().to_string(),
            Err(DockerError::Failed { .. }) => "not_found".to_string(),
            Err(e) => {
                tracing::warn!(service = %service, error = %e, "status probe failed");
                "unknown".to_string()
            }
        }
    }

    fn tail_logs(&self, service: ServiceKey, lines: u32) -> Result<String, Self::Error> {
        self.run(service, &Self::logs_args(service, lines))
    }
}
