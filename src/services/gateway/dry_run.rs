use super::r#trait::{Invocation, ProcessGateway, ProcessOutput};
use crate::config::Config;
use crate::error::ProcessError;
use crate::model::QueryKind;
use tracing::info;

const FAKE_WINDOWS: &str = r#"[
  {"id": 101, "app": "Terminal", "title": "zsh - dry_run", "display": 1, "space": 1, "has-focus": true, "is-native-fullscreen": false},
  {"id": 102, "app": "Google Chrome", "title": "Inbox - dry_run", "display": 1, "space": 2, "has-focus": false, "is-native-fullscreen": false},
  {"id": 103, "app": "Code", "title": "main.rs - dry_run", "display": 2, "space": 3, "has-focus": false, "is-native-fullscreen": false},
  {"id": 104, "app": "Google Chrome", "title": "Docs - dry_run", "display": 2, "space": 3, "has-focus": false, "is-native-fullscreen": true}
]"#;

const FAKE_SPACES: &str = r#"[
  {"index": 1, "label": "term", "display": 1, "windows": [101], "has-focus": true},
  {"index": 2, "label": "web", "display": 1, "windows": [102], "has-focus": false},
  {"index": 3, "label": "code", "display": 2, "windows": [103, 104], "has-focus": false}
]"#;

const FAKE_DISPLAYS: &str = r#"[
  {"id": 1, "index": 1, "spaces": [1, 2], "has-focus": true},
  {"id": 2, "index": 2, "spaces": [3], "has-focus": false}
]"#;

/// Отвечает заготовленными снимками вместо запуска оконного менеджера.
pub struct DryRunGateway {
    routes: Vec<(Vec<String>, QueryKind)>,
}

impl DryRunGateway {
    pub fn new(config: &Config) -> Self {
        let routes = [QueryKind::Windows, QueryKind::Spaces, QueryKind::Displays]
            .into_iter()
            .map(|kind| (config.args_for(kind).to_vec(), kind))
            .collect();
        Self { routes }
    }

    fn snapshot_for(&self, args: &[String]) -> Option<&'static str> {
        let kind = self
            .routes
            .iter()
            .find(|(route, _)| route.as_slice() == args)
            .map(|(_, kind)| *kind)?;

        Some(match kind {
            QueryKind::Windows => FAKE_WINDOWS,
            QueryKind::Spaces => FAKE_SPACES,
            QueryKind::Displays => FAKE_DISPLAYS,
        })
    }
}

#[async_trait::async_trait]
impl ProcessGateway for DryRunGateway {
    async fn execute(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        info!("[DRY RUN] {}", invocation.display());

        match self.snapshot_for(&invocation.args) {
            Some(snapshot) => Ok(ProcessOutput {
                stdout: snapshot.to_string(),
                stderr: String::new(),
            }),
            None => Err(ProcessError::Exit {
                command: invocation.command.clone(),
                exit_code: Some(1),
                stderr: format!("dry run: неизвестный запрос '{}'", invocation.args.join(" ")),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DisplayInfo, SpaceInfo, WindowEntity};

    #[tokio::test]
    async fn dry_run_serves_every_query_kind() {
        let config = Config::default();
        let gateway = DryRunGateway::new(&config);

        let windows = gateway
            .execute(&Invocation::new("yabai", config.args_for(QueryKind::Windows)))
            .await
            .unwrap();
        let windows: Vec<WindowEntity> = serde_json::from_str(&windows.stdout).unwrap();
        assert_eq!(windows.len(), 4);
        assert_eq!(windows.iter().filter(|w| w.focused).count(), 1);

        let spaces = gateway
            .execute(&Invocation::new("yabai", config.args_for(QueryKind::Spaces)))
            .await
            .unwrap();
        let spaces: Vec<SpaceInfo> = serde_json::from_str(&spaces.stdout).unwrap();
        assert_eq!(spaces.len(), 3);

        let displays = gateway
            .execute(&Invocation::new("yabai", config.args_for(QueryKind::Displays)))
            .await
            .unwrap();
        let displays: Vec<DisplayInfo> = serde_json::from_str(&displays.stdout).unwrap();
        assert_eq!(displays.len(), 2);
    }

    #[tokio::test]
    async fn dry_run_rejects_unknown_query() {
        let gateway = DryRunGateway::new(&Config::default());
        let err = gateway
            .execute(&Invocation::new("yabai", &["-m".to_string(), "window".to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Exit { exit_code: Some(1), .. }));
    }
}
