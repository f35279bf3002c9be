//! Binding of raw command-line flags to a command's typed parameters.

use crate::config::{OutputMode, Profile};
use crate::constants;
use crate::engine::context::{ExecutionParameter, FileReference, InputStream, ParameterValue};
use crate::error::Error;
use crate::spec::{Command, CommandParameter, ParameterLocation, ParameterType};
use indexmap::IndexMap;

/// Flags following the command path, with the reserved global flags pulled
/// out. Values of repeated flags are kept in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArguments {
    pub debug: bool,
    pub insecure: bool,
    pub help: bool,
    pub profile: Option<String>,
    pub output: Option<OutputMode>,
    values: IndexMap<String, Vec<Option<String>>>,
}

impl RawArguments {
    /// Lexes `--flag value`, `--flag=value` and bare `--flag` tokens.
    ///
    /// # Errors
    ///
    /// Returns an error for positional tokens, a global flag missing its
    /// value, or an invalid `--output` value.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, Error> {
        let mut args = Self::default();
        let mut iter = tokens.iter().map(AsRef::as_ref).peekable();

        while let Some(token) = iter.next() {
            let Some(flag) = token.strip_prefix("--").filter(|f| !f.is_empty()) else {
                return Err(Error::UnexpectedArgument {
                    value: token.to_string(),
                });
            };

            let (name, value) = match flag.split_once('=') {
                Some((name, value)) => (name.to_string(), Some(value.to_string())),
                None => {
                    let value = iter
                        .next_if(|next| !next.starts_with("--"))
                        .map(str::to_string);
                    (flag.to_string(), value)
                }
            };

            match name.as_str() {
                constants::FLAG_DEBUG => args.debug = parse_switch(&name, value.as_deref())?,
                constants::FLAG_INSECURE => {
                    args.insecure = parse_switch(&name, value.as_deref())?;
                }
                constants::FLAG_HELP => args.help = true,
                constants::FLAG_PROFILE => {
                    args.profile = Some(value.ok_or_else(|| Error::missing_argument(&name))?);
                }
                constants::FLAG_OUTPUT => {
                    let value = value.ok_or_else(|| Error::missing_argument(&name))?;
                    let mode = value.parse::<OutputMode>().map_err(|_| Error::InvalidArgument {
                        flag: name.clone(),
                        value: value.clone(),
                        expected: "json or text".to_string(),
                    })?;
                    args.output = Some(mode);
                }
                _ => args.values.entry(name).or_default().push(value),
            }
        }

        Ok(args)
    }

    #[must_use]
    pub fn contains(&self, flag: &str) -> bool {
        self.values.contains_key(flag)
    }

    /// Non-global flags in the order they were first given
    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

fn parse_switch(flag: &str, value: Option<&str>) -> Result<bool, Error> {
    match value {
        None => Ok(true),
        Some(v) => parse_bool(flag, v),
    }
}

fn parse_bool(flag: &str, value: &str) -> Result<bool, Error> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(flag, value, "boolean")),
    }
}

fn invalid(flag: &str, value: &str, expected: &str) -> Error {
    Error::InvalidArgument {
        flag: flag.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

/// Splits the leading `definition group command` words from the flags that
/// follow them. At most three words are taken.
#[must_use]
pub fn split_command_path<S: AsRef<str>>(args: &[S]) -> (Vec<&str>, &[S]) {
    let count = args
        .iter()
        .take(3)
        .take_while(|arg| !arg.as_ref().starts_with('-'))
        .count();
    let (path, rest) = args.split_at(count);
    (path.iter().map(AsRef::as_ref).collect(), rest)
}

/// Binds `args` to the parameters of `command`.
///
/// For each parameter the first available source wins: the explicit flag,
/// the profile default map for its location, the schema default, then the
/// pre-supplied `input` for file parameters. A required parameter with no
/// source fails with `Argument --<flag> is missing`. The command is only
/// read, never modified.
///
/// # Errors
///
/// Returns `UnknownArgument`, `InvalidArgument` or `MissingArgument`.
pub fn bind(
    command: &Command,
    args: &RawArguments,
    profile: &Profile,
    input: Option<&InputStream>,
) -> Result<Vec<ExecutionParameter>, Error> {
    if let Some(unknown) = args.flags().find(|flag| command.parameter(flag).is_none()) {
        return Err(Error::UnknownArgument {
            flag: unknown.to_string(),
        });
    }

    let mut input = input.cloned();
    let mut bound = Vec::with_capacity(command.parameters.len());

    for parameter in &command.parameters {
        let value = if let Some(values) = args.values.get(&parameter.flag) {
            Some(coerce_all(parameter, values)?)
        } else if let Some(text) = profile_default(parameter, profile) {
            Some(coerce(parameter, &parameter.param_type, text)?)
        } else if let Some(default) = &parameter.default {
            Some(from_json(&parameter.param_type, default))
        } else if parameter.param_type.is_file() {
            input
                .take()
                .map(|stream| ParameterValue::File(FileReference::from_stream(&parameter.name, stream)))
        } else {
            None
        };

        match value {
            Some(value) => bound.push(ExecutionParameter {
                name: parameter.name.clone(),
                location: parameter.location,
                value,
            }),
            None if parameter.required => {
                return Err(Error::missing_argument(&parameter.flag));
            }
            None => {}
        }
    }

    Ok(bound)
}

fn profile_default<'a>(parameter: &CommandParameter, profile: &'a Profile) -> Option<&'a str> {
    let map = match parameter.location {
        ParameterLocation::Path => &profile.path,
        ParameterLocation::Query => &profile.query,
        ParameterLocation::Header => &profile.header,
        ParameterLocation::Body | ParameterLocation::Form => return None,
    };
    map.get(&parameter.name)
        .or_else(|| map.get(&parameter.flag))
        .map(String::as_str)
}

fn coerce_all(parameter: &CommandParameter, values: &[Option<String>]) -> Result<ParameterValue, Error> {
    if let ParameterType::Array(item) = &parameter.param_type {
        let mut items = Vec::new();
        for value in values {
            let text = value
                .as_deref()
                .ok_or_else(|| Error::missing_argument(&parameter.flag))?;
            for piece in text.split(',').filter(|p| !p.is_empty()) {
                items.push(coerce(parameter, item, piece)?);
            }
        }
        return Ok(ParameterValue::Array(items));
    }

    match values.last().and_then(Option::as_deref) {
        Some(text) => coerce(parameter, &parameter.param_type, text),
        None if parameter.param_type.is_boolean() => Ok(ParameterValue::Boolean(true)),
        None => Err(Error::missing_argument(&parameter.flag)),
    }
}

fn coerce(
    parameter: &CommandParameter,
    param_type: &ParameterType,
    text: &str,
) -> Result<ParameterValue, Error> {
    let flag = parameter.flag.as_str();
    let value = match param_type {
        ParameterType::String => ParameterValue::String(text.to_string()),
        ParameterType::Integer => ParameterValue::Integer(
            text.parse()
                .map_err(|_| invalid(flag, text, &param_type.type_name()))?,
        ),
        ParameterType::Number => ParameterValue::Number(
            text.parse()
                .map_err(|_| invalid(flag, text, &param_type.type_name()))?,
        ),
        ParameterType::Boolean => ParameterValue::Boolean(parse_bool(flag, text)?),
        ParameterType::Object => ParameterValue::Json(
            serde_json::from_str(text).map_err(|_| invalid(flag, text, "object"))?,
        ),
        ParameterType::Array(item) => ParameterValue::Array(
            text.split(',')
                .filter(|p| !p.is_empty())
                .map(|piece| coerce(parameter, item, piece))
                .collect::<Result<_, _>>()?,
        ),
        ParameterType::Binary | ParameterType::Stream => {
            let expanded = shellexpand::full(text).map_or_else(|_| text.to_string(), |p| p.to_string());
            ParameterValue::File(FileReference::from_path(expanded))
        }
    };
    Ok(value)
}

fn from_json(param_type: &ParameterType, value: &serde_json::Value) -> ParameterValue {
    match (param_type, value) {
        (ParameterType::String, serde_json::Value::String(s)) => ParameterValue::String(s.clone()),
        (ParameterType::String, other) => ParameterValue::String(other.to_string()),
        (ParameterType::Integer, v) if v.is_i64() => {
            ParameterValue::Integer(v.as_i64().unwrap_or_default())
        }
        (ParameterType::Number, v) if v.is_number() => {
            ParameterValue::Number(v.as_f64().unwrap_or_default())
        }
        (ParameterType::Boolean, serde_json::Value::Bool(b)) => ParameterValue::Boolean(*b),
        (ParameterType::Array(item), serde_json::Value::Array(items)) => {
            ParameterValue::Array(items.iter().map(|v| from_json(item, v)).collect())
        }
        (_, other) => ParameterValue::Json(other.clone()),
    }
}
