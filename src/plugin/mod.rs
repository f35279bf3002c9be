//! Commands implemented in code rather than generated from a definition.
//!
//! A plugin contributes one command to a named definition. When the
//! definition is loaded the plugin command replaces any generated command with
//! the same group and name.

pub mod digitizer;
pub mod orchestrator;

use crate::engine::context::ExecutionContext;
use crate::engine::executor::CommandOutput;
use crate::error::Error;
use crate::spec::{Command, CommandParameter, Visibility};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait CommandPlugin: Send + Sync {
    /// Metadata of the contributed command
    fn command(&self) -> PluginCommand;

    async fn execute(&self, context: &ExecutionContext) -> Result<CommandOutput, Error>;
}

/// Where a plugin command is mounted and what it accepts
#[derive(Debug, Clone, PartialEq)]
pub struct PluginCommand {
    pub definition: String,
    pub group: String,
    pub name: String,
    pub description: String,
    pub parameters: Vec<CommandParameter>,
    pub visibility: Visibility,
}

impl PluginCommand {
    #[must_use]
    pub fn new(definition: &str, group: &str, name: &str, description: &str) -> Self {
        Self {
            definition: definition.to_string(),
            group: group.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            visibility: Visibility::Listed,
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: CommandParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Not listed; invoking it fails with `reason`
    #[must_use]
    pub fn disabled(mut self, reason: &str) -> Self {
        self.visibility = Visibility::Disabled {
            reason: reason.to_string(),
        };
        self
    }

    #[must_use]
    pub fn to_command(&self) -> Command {
        Command {
            definition: self.definition.clone(),
            group: self.group.clone(),
            name: self.name.clone(),
            summary: Some(self.description.clone()),
            description: Some(self.description.clone()),
            method: String::new(),
            route: String::new(),
            content_type: None,
            parameters: self.parameters.clone(),
            visibility: self.visibility.clone(),
            plugin: true,
        }
    }
}

type PluginKey = (String, String, String);

/// Plugins keyed by definition, group and command name
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<PluginKey, Arc<dyn CommandPlugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Digitize, digitize-result, bucket upload and bucket download
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(digitizer::DigitizeCommand::new()));
        registry.register(Arc::new(digitizer::DigitizeResultCommand));
        registry.register(Arc::new(orchestrator::UploadCommand));
        registry.register(Arc::new(orchestrator::DownloadCommand));
        registry
    }

    /// Adds `plugin`, replacing a plugin registered for the same command
    pub fn register(&mut self, plugin: Arc<dyn CommandPlugin>) {
        let command = plugin.command();
        self.plugins
            .insert((command.definition, command.group, command.name), plugin);
    }

    #[must_use]
    pub fn get(&self, definition: &str, group: &str, name: &str) -> Option<Arc<dyn CommandPlugin>> {
        self.plugins
            .get(&(definition.to_string(), group.to_string(), name.to_string()))
            .cloned()
    }

    /// Commands contributed to `definition`, ordered by group and name
    #[must_use]
    pub fn commands_for(&self, definition: &str) -> Vec<Command> {
        let mut commands: Vec<Command> = self
            .plugins
            .iter()
            .filter(|((def, _, _), _)| def == definition)
            .map(|(_, plugin)| plugin.command().to_command())
            .collect();
        commands.sort_by(|a, b| (&a.group, &a.name).cmp(&(&b.group, &b.name)));
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = PluginRegistry::standard();
        let du: Vec<String> = registry
            .commands_for("du")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(du, vec!["digitize", "digitize-result"]);
        assert!(registry.get("orchestrator", "buckets", "upload").is_some());
        assert!(registry.get("orchestrator", "buckets", "delete").is_none());
    }

    #[test]
    fn test_to_command_marks_plugin() {
        let command = PluginCommand::new("du", "digitization", "digitize-result", "Result")
            .disabled("not supported")
            .to_command();
        assert!(command.plugin);
        assert_eq!(
            command.visibility,
            Visibility::Disabled {
                reason: "not supported".into()
            }
        );
    }
}
