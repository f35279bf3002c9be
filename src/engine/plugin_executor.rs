use crate::constants;
use crate::engine::context::ExecutionContext;
use crate::engine::executor::CommandOutput;
use crate::error::Error;
use crate::plugin::PluginRegistry;
use crate::spec::Command;

/// Dispatches plugin commands to their registered implementation
#[derive(Clone, Default)]
pub struct PluginExecutor {
    registry: PluginRegistry,
}

impl PluginExecutor {
    #[must_use]
    pub const fn new(registry: PluginRegistry) -> Self {
        Self { registry }
    }

    /// # Errors
    ///
    /// Returns `UnknownCommand` when no plugin is registered for `command`,
    /// otherwise the plugin's error.
    pub async fn execute(
        &self,
        command: &Command,
        context: &ExecutionContext,
    ) -> Result<CommandOutput, Error> {
        let plugin = self
            .registry
            .get(&command.definition, &command.group, &command.name)
            .ok_or_else(|| Error::UnknownCommand {
                definition: command.definition.clone(),
                group: command.group.clone(),
                name: command.name.clone(),
            })?;
        tracing::debug!(
            target: constants::LOG_TARGET_PLUGIN,
            definition = %command.definition,
            group = %command.group,
            command = %command.name,
            "executing plugin command"
        );
        plugin.execute(context).await
    }
}
