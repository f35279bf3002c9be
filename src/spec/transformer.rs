use crate::constants;
use crate::error::Error;
use crate::spec::models::{
    Command, CommandParameter, CommandTree, ParameterLocation, ParameterType, ServerTemplate,
    Visibility,
};
use crate::spec::{http_methods_iter, ReferenceResolver};
use crate::utils::to_kebab_case;
use indexmap::IndexMap;
use openapiv3::{
    OpenAPI, Operation, Parameter, ParameterSchemaOrContent, ReferenceOr, RequestBody, Schema,
    SchemaKind, StringFormat, Type, VariantOrUnknownOrEmpty,
};
use std::collections::HashSet;

/// Transforms a parsed definition into a [`CommandTree`].
pub struct DefinitionTransformer<'a> {
    name: &'a str,
}

struct BodyParameters {
    content_type: Option<String>,
    parameters: Vec<CommandParameter>,
}

impl<'a> DefinitionTransformer<'a> {
    #[must_use]
    pub const fn new(name: &'a str) -> Self {
        Self { name }
    }

    /// Builds the tree for `spec`, then applies plugin overrides: a plugin
    /// command replaces any parsed operation with the same name and is
    /// placed in the plugin's own group.
    ///
    /// # Errors
    ///
    /// Returns a definition error on duplicate operation ids, duplicate
    /// flags within one command, or unresolvable references. No partial tree
    /// is ever returned.
    pub fn transform(
        &self,
        spec: &OpenAPI,
        plugin_commands: Vec<Command>,
    ) -> Result<CommandTree, Error> {
        let resolver = ReferenceResolver::new(self.name, spec);
        let mut commands: Vec<Command> = Vec::new();
        let mut operation_ids = HashSet::new();

        for (route, path_item) in &spec.paths.paths {
            let ReferenceOr::Item(item) = path_item else {
                continue;
            };
            for (method, operation) in http_methods_iter(item) {
                let Some(operation) = operation else {
                    continue;
                };
                if let Some(id) = &operation.operation_id {
                    if !operation_ids.insert(id.clone()) {
                        return Err(Error::definition(
                            self.name,
                            format!("duplicate operation id '{id}'"),
                        ));
                    }
                }
                let command =
                    self.transform_operation(&resolver, method, route, &item.parameters, operation)?;
                if commands
                    .iter()
                    .any(|c| c.group == command.group && c.name == command.name)
                {
                    return Err(Error::definition(
                        self.name,
                        format!(
                            "duplicate command '{} {}' for {method} {route}",
                            command.group, command.name
                        ),
                    ));
                }
                commands.push(command);
            }
        }

        for plugin in plugin_commands {
            commands.retain(|c| c.name != plugin.name);
            commands.push(plugin);
        }

        Ok(CommandTree::new(
            self.name,
            spec.info.description.clone(),
            server_template(spec),
            commands,
        ))
    }

    fn transform_operation(
        &self,
        resolver: &ReferenceResolver<'_>,
        method: &str,
        route: &str,
        shared_parameters: &[ReferenceOr<Parameter>],
        operation: &Operation,
    ) -> Result<Command, Error> {
        let group = operation
            .tags
            .first()
            .map(|tag| to_kebab_case(tag))
            .filter(|tag| !tag.is_empty())
            .unwrap_or_else(|| constants::DEFAULT_GROUP.to_string());

        let name = operation.operation_id.as_ref().map_or_else(
            || to_kebab_case(&format!("{method} {route}")),
            |id| to_kebab_case(id),
        );

        // Operation-level parameters override path-level ones with the same
        // name and location.
        let mut merged: IndexMap<(String, ParameterLocation), CommandParameter> = IndexMap::new();
        for param_ref in shared_parameters.iter().chain(&operation.parameters) {
            let param = resolver.parameter(param_ref)?;
            if let Some(parameter) = self.transform_parameter(resolver, &param)? {
                merged.insert((parameter.name.clone(), parameter.location), parameter);
            }
        }
        let mut parameters: Vec<CommandParameter> = merged.into_values().collect();

        let mut content_type = None;
        if let Some(body_ref) = &operation.request_body {
            let body = resolver.request_body(body_ref)?;
            let body_parameters = self.transform_request_body(resolver, &body)?;
            content_type = body_parameters.content_type;
            parameters.extend(body_parameters.parameters);
        }

        let mut flags = HashSet::new();
        for parameter in &parameters {
            if !flags.insert(parameter.flag.as_str()) {
                return Err(Error::definition(
                    self.name,
                    format!("duplicate parameter '--{}' in operation '{name}'", parameter.flag),
                ));
            }
        }

        let hidden_extension = operation
            .extensions
            .get(constants::EXT_CLI_HIDDEN)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let visibility = if operation.summary.is_none() || hidden_extension {
            Visibility::Hidden
        } else {
            Visibility::Listed
        };

        Ok(Command {
            definition: self.name.to_string(),
            group,
            name,
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            method: method.to_string(),
            route: route.to_string(),
            content_type,
            parameters,
            visibility,
            plugin: false,
        })
    }

    fn transform_parameter(
        &self,
        resolver: &ReferenceResolver<'_>,
        param: &Parameter,
    ) -> Result<Option<CommandParameter>, Error> {
        let (data, location) = match param {
            Parameter::Query { parameter_data, .. } => (parameter_data, ParameterLocation::Query),
            Parameter::Header { parameter_data, .. } => {
                (parameter_data, ParameterLocation::Header)
            }
            Parameter::Path { parameter_data, .. } => (parameter_data, ParameterLocation::Path),
            Parameter::Cookie { parameter_data, .. } => {
                tracing::debug!(
                    definition = self.name,
                    parameter = parameter_data.name.as_str(),
                    "skipping cookie parameter"
                );
                return Ok(None);
            }
        };

        let (param_type, default) = match &data.format {
            ParameterSchemaOrContent::Schema(schema_ref) => {
                let schema = resolver.schema(schema_ref)?;
                (
                    schema_type(resolver, &schema)?,
                    schema.schema_data.default.clone(),
                )
            }
            ParameterSchemaOrContent::Content(_) => (ParameterType::String, None),
        };

        let mut parameter = CommandParameter::new(&data.name, param_type, location)
            .required(data.required || location == ParameterLocation::Path);
        parameter.default = default;
        parameter.description.clone_from(&data.description);
        Ok(Some(parameter))
    }

    fn transform_request_body(
        &self,
        resolver: &ReferenceResolver<'_>,
        body: &RequestBody,
    ) -> Result<BodyParameters, Error> {
        let json = body
            .content
            .iter()
            .find(|(content_type, _)| content_type.contains("json"));
        if let Some((content_type, media)) = json {
            let schema = media
                .schema
                .as_ref()
                .map(|s| resolver.schema(s))
                .transpose()?;
            let parameters = match schema {
                Some(schema) if is_object(&schema) => {
                    self.property_parameters(resolver, &schema, ParameterLocation::Body, body.required)?
                }
                _ => vec![CommandParameter::new(
                    constants::JSON_BODY_PARAMETER,
                    ParameterType::Object,
                    ParameterLocation::Body,
                )
                .required(body.required)
                .with_description("The request body as JSON")],
            };
            return Ok(BodyParameters {
                content_type: Some(content_type.clone()),
                parameters,
            });
        }

        let form = body.content.iter().find(|(content_type, _)| {
            content_type.starts_with(constants::CONTENT_TYPE_MULTIPART)
                || content_type.starts_with("application/x-www-form-urlencoded")
        });
        if let Some((content_type, media)) = form {
            let parameters = match media.schema.as_ref().map(|s| resolver.schema(s)).transpose()? {
                Some(schema) => {
                    self.property_parameters(resolver, &schema, ParameterLocation::Form, body.required)?
                }
                None => Vec::new(),
            };
            return Ok(BodyParameters {
                content_type: Some(content_type.clone()),
                parameters,
            });
        }

        let Some(content_type) = body.content.keys().next() else {
            return Ok(BodyParameters {
                content_type: None,
                parameters: Vec::new(),
            });
        };
        Ok(BodyParameters {
            content_type: Some(content_type.clone()),
            parameters: vec![CommandParameter::new(
                constants::RAW_BODY_PARAMETER,
                ParameterType::Stream,
                ParameterLocation::Body,
            )
            .required(body.required)
            .with_description("The file to upload")],
        })
    }

    fn property_parameters(
        &self,
        resolver: &ReferenceResolver<'_>,
        schema: &Schema,
        location: ParameterLocation,
        body_required: bool,
    ) -> Result<Vec<CommandParameter>, Error> {
        let SchemaKind::Type(Type::Object(object)) = &schema.schema_kind else {
            return Ok(Vec::new());
        };

        let mut parameters = Vec::with_capacity(object.properties.len());
        for (name, property_ref) in &object.properties {
            let property = resolver.boxed_schema(property_ref)?;
            if property.schema_data.read_only {
                continue;
            }
            let mut parameter = CommandParameter::new(name, schema_type(resolver, &property)?, location)
                .required(body_required && object.required.contains(name));
            parameter.default.clone_from(&property.schema_data.default);
            parameter.description.clone_from(&property.schema_data.description);
            parameters.push(parameter);
        }
        Ok(parameters)
    }
}

fn server_template(spec: &OpenAPI) -> ServerTemplate {
    let Some(server) = spec.servers.first() else {
        return ServerTemplate {
            url: constants::DEFAULT_SERVER_URL.to_string(),
            defaults: IndexMap::new(),
        };
    };

    let defaults = server
        .variables
        .iter()
        .flatten()
        .filter(|(_, variable)| !variable.default.is_empty())
        .map(|(name, variable)| (name.clone(), variable.default.clone()))
        .collect();

    ServerTemplate {
        url: server.url.clone(),
        defaults,
    }
}

const fn is_object(schema: &Schema) -> bool {
    matches!(schema.schema_kind, SchemaKind::Type(Type::Object(_)))
}

fn schema_type(resolver: &ReferenceResolver<'_>, schema: &Schema) -> Result<ParameterType, Error> {
    let param_type = match &schema.schema_kind {
        SchemaKind::Type(Type::String(string_type)) => match &string_type.format {
            VariantOrUnknownOrEmpty::Item(StringFormat::Binary) => ParameterType::Binary,
            _ => ParameterType::String,
        },
        SchemaKind::Type(Type::Integer(_)) => ParameterType::Integer,
        SchemaKind::Type(Type::Number(_)) => ParameterType::Number,
        SchemaKind::Type(Type::Boolean(_)) => ParameterType::Boolean,
        SchemaKind::Type(Type::Object(_))
        | SchemaKind::AllOf { .. }
        | SchemaKind::OneOf { .. }
        | SchemaKind::AnyOf { .. } => ParameterType::Object,
        SchemaKind::Type(Type::Array(array)) => {
            let item = match &array.items {
                Some(item_ref) => {
                    let item = resolver.boxed_schema(item_ref)?;
                    match schema_type(resolver, &item)? {
                        scalar @ (ParameterType::String
                        | ParameterType::Integer
                        | ParameterType::Number
                        | ParameterType::Boolean) => scalar,
                        _ => return Ok(ParameterType::Object),
                    }
                }
                None => ParameterType::String,
            };
            ParameterType::Array(Box::new(item))
        }
        _ => ParameterType::String,
    };
    Ok(param_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse_definition;

    fn transform(content: &str) -> Result<CommandTree, Error> {
        let spec = parse_definition("orchestrator", content)?;
        DefinitionTransformer::new("orchestrator").transform(&spec, Vec::new())
    }

    #[test]
    fn test_groups_by_first_tag_and_names_by_operation_id() {
        let tree = transform(
            r"
paths:
  /odata/Buckets:
    get:
      tags: [Buckets]
      summary: Lists buckets
      operationId: Buckets_Get
",
        )
        .unwrap();
        let command = tree.find("buckets", "buckets-get").unwrap();
        assert_eq!(command.method, "GET");
        assert_eq!(command.route, "/odata/Buckets");
        assert_eq!(command.visibility, Visibility::Listed);
    }

    #[test]
    fn test_untagged_operation_without_id() {
        let tree = transform(
            r"
paths:
  /ping:
    get:
      summary: Ping
",
        )
        .unwrap();
        assert!(tree.find("default", "get-ping").is_some());
    }

    #[test]
    fn test_operation_without_summary_is_hidden() {
        let tree = transform(
            r"
paths:
  /ping:
    get:
      operationId: ping
  /pong:
    get:
      operationId: pong
      summary: Pong
      x-cli-hidden: true
",
        )
        .unwrap();
        assert_eq!(tree.find("default", "ping").unwrap().visibility, Visibility::Hidden);
        assert_eq!(tree.find("default", "pong").unwrap().visibility, Visibility::Hidden);
        assert_eq!(tree.listed_groups().count(), 0);
    }

    #[test]
    fn test_path_level_parameters_are_merged() {
        let tree = transform(
            r"
paths:
  /folders/{folderId}/items:
    parameters:
    - name: folderId
      in: path
      schema:
        type: integer
    - name: top
      in: query
      schema:
        type: integer
    get:
      operationId: listItems
      summary: List
      parameters:
      - name: top
        in: query
        required: true
        schema:
          type: integer
          default: 10
",
        )
        .unwrap();
        let command = tree.find("default", "list-items").unwrap();
        assert_eq!(command.parameters.len(), 2);
        let folder = command.parameter("folder-id").unwrap();
        assert!(folder.required);
        assert_eq!(folder.location, ParameterLocation::Path);
        let top = command.parameter("top").unwrap();
        assert!(top.required);
        assert_eq!(top.default, Some(serde_json::json!(10)));
    }

    #[test]
    fn test_json_body_properties_become_flags() {
        let tree = transform(
            r"
paths:
  /users:
    post:
      operationId: createUser
      summary: Create
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/User'
components:
  schemas:
    User:
      type: object
      required: [userName]
      properties:
        userName:
          type: string
        roles:
          type: array
          items:
            type: string
        settings:
          type: object
",
        )
        .unwrap();
        let command = tree.find("default", "create-user").unwrap();
        assert_eq!(command.content_type.as_deref(), Some("application/json"));
        let user_name = command.parameter("user-name").unwrap();
        assert!(user_name.required);
        assert_eq!(user_name.location, ParameterLocation::Body);
        assert_eq!(
            command.parameter("roles").unwrap().param_type,
            ParameterType::Array(Box::new(ParameterType::String))
        );
        assert_eq!(
            command.parameter("settings").unwrap().param_type,
            ParameterType::Object
        );
    }

    #[test]
    fn test_multipart_binary_becomes_file_parameter() {
        let tree = transform(
            r"
paths:
  /digitize:
    post:
      operationId: digitize
      summary: Digitize
      requestBody:
        content:
          multipart/form-data:
            schema:
              type: object
              properties:
                file:
                  type: string
                  format: binary
",
        )
        .unwrap();
        let file = tree.find("default", "digitize").unwrap().parameter("file").unwrap();
        assert_eq!(file.param_type, ParameterType::Binary);
        assert_eq!(file.location, ParameterLocation::Form);
    }

    #[test]
    fn test_other_content_type_is_raw_stream() {
        let tree = transform(
            r"
paths:
  /blob:
    put:
      operationId: putBlob
      summary: Upload
      requestBody:
        required: true
        content:
          application/octet-stream: {}
",
        )
        .unwrap();
        let command = tree.find("default", "put-blob").unwrap();
        let file = command.parameter("file").unwrap();
        assert_eq!(file.param_type, ParameterType::Stream);
        assert!(file.required);
        assert_eq!(command.content_type.as_deref(), Some("application/octet-stream"));
    }

    #[test]
    fn test_duplicate_operation_id_fails() {
        let err = transform(
            r"
paths:
  /a:
    get:
      operationId: same
  /b:
    get:
      operationId: same
",
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate operation id 'same'"));
        assert!(err.to_string().contains("'orchestrator'"));
    }

    #[test]
    fn test_duplicate_flag_fails() {
        let err = transform(
            r"
paths:
  /a:
    get:
      operationId: a
      parameters:
      - name: folder_id
        in: query
        schema:
          type: string
      - name: folderId
        in: header
        schema:
          type: string
",
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate parameter '--folder-id'"));
    }

    #[test]
    fn test_server_template_defaults() {
        let tree = transform(
            r"
servers:
- url: https://cloud.example.com/{organization}/{tenant}/orchestrator_
  variables:
    organization:
      default: ''
    tenant:
      default: DefaultTenant
",
        )
        .unwrap();
        assert!(tree.server.url.ends_with("/orchestrator_"));
        assert_eq!(tree.server.defaults.get("tenant").unwrap(), "DefaultTenant");
        assert!(!tree.server.defaults.contains_key("organization"));
    }

    #[test]
    fn test_missing_servers_use_default_template() {
        let tree = transform("paths: {}").unwrap();
        assert_eq!(tree.server.url, constants::DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_plugin_replaces_operation_with_same_name() {
        let spec = parse_definition(
            "du",
            r"
paths:
  /digitize:
    post:
      tags: [Digitization]
      operationId: digitize
      summary: Parsed
",
        )
        .unwrap();
        let plugin = Command {
            definition: "du".into(),
            group: "digitization".into(),
            name: "digitize".into(),
            summary: Some("Plugin".into()),
            description: None,
            method: String::new(),
            route: String::new(),
            content_type: None,
            parameters: vec![],
            visibility: Visibility::Listed,
            plugin: true,
        };
        let tree = DefinitionTransformer::new("du")
            .transform(&spec, vec![plugin])
            .unwrap();
        assert_eq!(tree.commands.len(), 1);
        let command = tree.find("digitization", "digitize").unwrap();
        assert!(command.plugin);
        assert_eq!(command.summary.as_deref(), Some("Plugin"));
    }
}
