//! The command tree built from one definition.
//!
//! Commands live in an arena (`CommandTree::commands`) and groups refer to
//! them by `CommandId`. The tree is immutable once built.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    /// JSON text parsed into a value
    Object,
    Array(Box<ParameterType>),
    /// A file read from disk (or standard input) and sent as a form part
    Binary,
    /// A file sent as the raw request body
    Stream,
}

impl ParameterType {
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::Binary | Self::Stream)
    }

    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }

    /// Name used in conversion errors and help output
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Number => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Object => "object".to_string(),
            Self::Array(item) => format!("{}[]", item.type_name()),
            Self::Binary => "binary".to_string(),
            Self::Stream => "stream".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    Form,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandParameter {
    /// Name as it appears on the wire
    pub name: String,
    /// Kebab-case flag without the leading dashes
    pub flag: String,
    pub param_type: ParameterType,
    pub location: ParameterLocation,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub description: Option<String>,
}

impl CommandParameter {
    #[must_use]
    pub fn new(name: &str, param_type: ParameterType, location: ParameterLocation) -> Self {
        Self {
            name: name.to_string(),
            flag: crate::utils::to_kebab_case(name),
            param_type,
            location,
            required: false,
            default: None,
            description: None,
        }
    }

    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Listed,
    /// Parsed and executable, but not listed in help output
    Hidden,
    /// Not listed; invoking it fails with `reason`
    Disabled { reason: String },
}

impl Visibility {
    #[must_use]
    pub const fn is_listed(&self) -> bool {
        matches!(self, Self::Listed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub definition: String,
    pub group: String,
    pub name: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub method: String,
    pub route: String,
    /// Request content type chosen from the operation's request body
    pub content_type: Option<String>,
    pub parameters: Vec<CommandParameter>,
    pub visibility: Visibility,
    /// Executed by a registered plugin instead of the HTTP executor
    pub plugin: bool,
}

impl Command {
    #[must_use]
    pub fn parameter(&self, flag: &str) -> Option<&CommandParameter> {
        self.parameters.iter().find(|p| p.flag == flag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGroup {
    pub name: String,
    pub commands: Vec<CommandId>,
}

/// Server URL template with the defaults declared for its variables
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerTemplate {
    pub url: String,
    pub defaults: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandTree {
    pub definition: String,
    pub description: Option<String>,
    pub server: ServerTemplate,
    pub groups: Vec<CommandGroup>,
    pub commands: Vec<Command>,
}

impl CommandTree {
    /// Builds the arena, grouping commands in first-seen order.
    #[must_use]
    pub fn new(
        definition: &str,
        description: Option<String>,
        server: ServerTemplate,
        commands: Vec<Command>,
    ) -> Self {
        let mut groups: Vec<CommandGroup> = Vec::new();
        for (index, command) in commands.iter().enumerate() {
            let id = CommandId(index);
            match groups.iter_mut().find(|g| g.name == command.group) {
                Some(group) => group.commands.push(id),
                None => groups.push(CommandGroup {
                    name: command.group.clone(),
                    commands: vec![id],
                }),
            }
        }

        Self {
            definition: definition.to_string(),
            description,
            server,
            groups,
            commands,
        }
    }

    #[must_use]
    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.commands.get(id.0)
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&CommandGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    #[must_use]
    pub fn find(&self, group: &str, name: &str) -> Option<&Command> {
        self.group(group)?
            .commands
            .iter()
            .filter_map(|id| self.get(*id))
            .find(|c| c.name == name)
    }

    /// Commands of a group in declaration order.
    pub fn commands_in<'a>(&'a self, group: &'a CommandGroup) -> impl Iterator<Item = &'a Command> {
        group.commands.iter().filter_map(|id| self.get(*id))
    }

    /// Groups with at least one listed command.
    pub fn listed_groups(&self) -> impl Iterator<Item = &CommandGroup> {
        self.groups
            .iter()
            .filter(|g| self.commands_in(g).any(|c| c.visibility.is_listed()))
    }
}
