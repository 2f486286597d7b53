use super::r#trait::{Invocation, ProcessGateway, ProcessOutput};
use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::ProcessError;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Окружение, без которого оконный менеджер не отвечает (нужен владелец сессии).
pub fn build_env_overrides() -> HashMap<String, String> {
    env_overrides_from(|key| std::env::var(key).ok())
}

fn env_overrides_from(lookup: impl Fn(&str) -> Option<String>) -> HashMap<String, String> {
    let mut env_vars = HashMap::new();

    let user = lookup("USER").filter(|u| !u.is_empty());
    let elevated = user.as_deref() == Some("root");

    // Под sudo запрос должен идти от имени пользователя сессии
    if elevated || user.is_none() {
        if let Some(session_user) = lookup("SUDO_USER").or_else(|| lookup("LOGNAME")) {
            debug!("Подставляем пользователя сессии: {}", session_user);
            env_vars.insert("USER".to_string(), session_user);
        }
    } else if let Some(user) = user {
        env_vars.insert("USER".to_string(), user);
    }

    if let Some(home) = lookup("HOME") {
        env_vars.insert("HOME".to_string(), home);
    }

    env_vars
}

pub struct CommandGateway {
    timeout: Duration,
}

impl CommandGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            timeout: Duration::from_millis(config.query.timeout_ms),
        }
    }

    fn create_command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.command);
        cmd.args(&invocation.args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait::async_trait]
impl ProcessGateway for CommandGateway {
    async fn execute(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        debug_if_enabled!("Запуск процесса: {}", invocation.display());

        let child = Self::create_command(invocation)
            .spawn()
            .map_err(|e| ProcessError::Spawn {
                command: invocation.command.clone(),
                message: e.to_string(),
            })?;

        // kill_on_drop гарантирует, что зависший процесс не переживёт таймаут
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ProcessError::Spawn {
                command: invocation.command.clone(),
                message: e.to_string(),
            })?,
            Err(_) => {
                return Err(ProcessError::Timeout {
                    command: invocation.command.clone(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ProcessError::Exit {
                command: invocation.command.clone(),
                exit_code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug_if_enabled!("{} вернул {} байт", invocation.command, stdout.len());
        Ok(ProcessOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn env_keeps_regular_user() {
        let env = env_overrides_from(lookup(&[("USER", "alice"), ("HOME", "/Users/alice")]));
        assert_eq!(env.get("USER").map(String::as_str), Some("alice"));
        assert_eq!(env.get("HOME").map(String::as_str), Some("/Users/alice"));
    }

    #[test]
    fn env_replaces_root_with_sudo_user() {
        let env = env_overrides_from(lookup(&[("USER", "root"), ("SUDO_USER", "bob")]));
        assert_eq!(env.get("USER").map(String::as_str), Some("bob"));
    }

    #[test]
    fn env_falls_back_to_logname() {
        let env = env_overrides_from(lookup(&[("LOGNAME", "carol")]));
        assert_eq!(env.get("USER").map(String::as_str), Some("carol"));
        assert!(!env.contains_key("HOME"));
    }

    #[tokio::test]
    async fn execute_collects_stdout() {
        let gateway = CommandGateway::new(&Config::default());
        let invocation = Invocation::new("sh", &["-c".to_string(), "printf '[1,2]'".to_string()]);

        let output = gateway.execute(&invocation).await.unwrap();
        assert_eq!(output.stdout, "[1,2]");
    }

    #[tokio::test]
    async fn execute_reports_exit_code_and_stderr() {
        let gateway = CommandGateway::new(&Config::default());
        let invocation = Invocation::new(
            "sh",
            &["-c".to_string(), "echo 'not running' >&2; exit 3".to_string()],
        );

        let err = gateway.execute(&invocation).await.unwrap_err();
        assert_eq!(
            err,
            ProcessError::Exit {
                command: "sh".to_string(),
                exit_code: Some(3),
                stderr: "not running".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn execute_reports_missing_binary() {
        let gateway = CommandGateway::new(&Config::default());
        let invocation = Invocation::new("winpick-definitely-missing-binary", &[]);

        let err = gateway.execute(&invocation).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn execute_times_out() {
        let mut config = Config::default();
        config.query.timeout_ms = 50;
        let gateway = CommandGateway::new(&config);
        let invocation = Invocation::new("sleep", &["5".to_string()]);

        let err = gateway.execute(&invocation).await.unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { timeout_ms: 50, .. }));
    }
}
