use crate::config::Config;
use crate::error::ProcessError;
use std::collections::HashMap;
use std::sync::Arc;

/// A single command to run: program, arguments and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl Invocation {
    pub fn new(command: impl Into<String>, args: &[String]) -> Self {
        Self {
            command: command.into(),
            args: args.to_vec(),
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// `command arg1 arg2` для логов
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Trait for gateways that can run in different modes
#[async_trait::async_trait]
pub trait ProcessGateway: Send + Sync {
    /// Run the command once and collect its output
    async fn execute(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError>;
}

/// Factory function to create an appropriate gateway based on the dry_run flag
pub fn create_gateway(config: &Config, dry_run: bool) -> Arc<dyn ProcessGateway> {
    if dry_run {
        Arc::new(super::dry_run::DryRunGateway::new(config))
    } else {
        Arc::new(super::process::CommandGateway::new(config))
    }
}
