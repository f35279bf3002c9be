//! Definition loading and transformation into command trees.

use crate::constants;

pub mod models;
pub mod parser;
pub mod store;
pub mod transformer;

pub use models::{
    Command, CommandGroup, CommandId, CommandParameter, CommandTree, ParameterLocation,
    ParameterType, ServerTemplate, Visibility,
};
pub use parser::parse_definition;
pub use store::DefinitionStore;
pub use transformer::DefinitionTransformer;

use crate::error::Error;
use openapiv3::{OpenAPI, Operation, Parameter, PathItem, ReferenceOr, RequestBody, Schema};
use std::collections::HashSet;

/// A helper type to iterate over all HTTP methods in a `PathItem`
pub type HttpMethodsIter<'a> = [(&'static str, &'a Option<Operation>); 8];

/// All HTTP methods of a `PathItem` with their optional operation
#[must_use]
pub const fn http_methods_iter(item: &PathItem) -> HttpMethodsIter<'_> {
    [
        (constants::HTTP_METHOD_GET, &item.get),
        (constants::HTTP_METHOD_POST, &item.post),
        (constants::HTTP_METHOD_PUT, &item.put),
        (constants::HTTP_METHOD_DELETE, &item.delete),
        (constants::HTTP_METHOD_PATCH, &item.patch),
        (constants::HTTP_METHOD_HEAD, &item.head),
        (constants::HTTP_METHOD_OPTIONS, &item.options),
        (constants::HTTP_METHOD_TRACE, &item.trace),
    ]
}

/// Maximum depth for resolving references to prevent runaway chains
pub const MAX_REFERENCE_DEPTH: usize = 10;

const PARAMETERS_PREFIX: &str = "#/components/parameters/";
const SCHEMAS_PREFIX: &str = "#/components/schemas/";
const REQUEST_BODIES_PREFIX: &str = "#/components/requestBodies/";

/// Resolves `$ref` pointers against a definition's components, detecting
/// cycles and bounding chain depth.
pub struct ReferenceResolver<'a> {
    definition: &'a str,
    spec: &'a OpenAPI,
}

impl<'a> ReferenceResolver<'a> {
    #[must_use]
    pub const fn new(definition: &'a str, spec: &'a OpenAPI) -> Self {
        Self { definition, spec }
    }

    /// # Errors
    ///
    /// Returns a definition error if the reference is malformed, missing,
    /// circular, or nested deeper than [`MAX_REFERENCE_DEPTH`].
    pub fn parameter(&self, param: &ReferenceOr<Parameter>) -> Result<Parameter, Error> {
        let spec = self.spec;
        match param {
            ReferenceOr::Item(item) => Ok(item.clone()),
            ReferenceOr::Reference { reference } => self.follow(
                reference,
                PARAMETERS_PREFIX,
                move |name: &str| spec.components.as_ref()?.parameters.get(name),
                &mut HashSet::new(),
                0,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a definition error if the reference cannot be resolved.
    pub fn request_body(&self, body: &ReferenceOr<RequestBody>) -> Result<RequestBody, Error> {
        let spec = self.spec;
        match body {
            ReferenceOr::Item(item) => Ok(item.clone()),
            ReferenceOr::Reference { reference } => self.follow(
                reference,
                REQUEST_BODIES_PREFIX,
                move |name: &str| spec.components.as_ref()?.request_bodies.get(name),
                &mut HashSet::new(),
                0,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a definition error if the reference cannot be resolved.
    pub fn schema(&self, schema: &ReferenceOr<Schema>) -> Result<Schema, Error> {
        match schema {
            ReferenceOr::Item(item) => Ok(item.clone()),
            ReferenceOr::Reference { reference } => self.schema_reference(reference),
        }
    }

    /// Same as [`Self::schema`] for the boxed form used by object properties
    /// and array items.
    ///
    /// # Errors
    ///
    /// Returns a definition error if the reference cannot be resolved.
    pub fn boxed_schema(&self, schema: &ReferenceOr<Box<Schema>>) -> Result<Schema, Error> {
        match schema {
            ReferenceOr::Item(item) => Ok((**item).clone()),
            ReferenceOr::Reference { reference } => self.schema_reference(reference),
        }
    }

    fn schema_reference(&self, reference: &str) -> Result<Schema, Error> {
        let spec = self.spec;
        self.follow(
            reference,
            SCHEMAS_PREFIX,
            move |name: &str| spec.components.as_ref()?.schemas.get(name),
            &mut HashSet::new(),
            0,
        )
    }

    fn follow<T, F>(
        &self,
        reference: &str,
        prefix: &str,
        lookup: F,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> Result<T, Error>
    where
        T: Clone + 'a,
        F: Fn(&str) -> Option<&'a ReferenceOr<T>> + Copy,
    {
        if depth >= MAX_REFERENCE_DEPTH {
            return Err(self.error(format!(
                "maximum reference depth ({MAX_REFERENCE_DEPTH}) exceeded while resolving '{reference}'"
            )));
        }

        if !visited.insert(reference.to_string()) {
            return Err(self.error(format!(
                "circular reference detected: '{reference}' is part of a reference cycle"
            )));
        }

        let name = reference.strip_prefix(prefix).ok_or_else(|| {
            self.error(format!(
                "invalid reference '{reference}', expected {prefix}{{name}}"
            ))
        })?;

        match lookup(name) {
            Some(ReferenceOr::Item(item)) => Ok(item.clone()),
            Some(ReferenceOr::Reference { reference: nested }) => {
                self.follow(nested, prefix, lookup, visited, depth + 1)
            }
            None => Err(self.error(format!("reference '{reference}' not found in components"))),
        }
    }

    fn error(&self, reason: String) -> Error {
        Error::definition(self.definition, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with_parameters(parameters: &str) -> OpenAPI {
        let yaml = format!(
            "openapi: 3.0.0\ninfo:\n  title: t\n  version: '1'\npaths: {{}}\ncomponents:\n  parameters:\n{parameters}"
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn test_resolves_nested_parameter_reference() {
        let spec = spec_with_parameters(
            "    alias:\n      $ref: '#/components/parameters/folderId'\n    folderId:\n      name: folderId\n      in: header\n      schema:\n        type: integer\n",
        );
        let resolver = ReferenceResolver::new("orchestrator", &spec);
        let param = ReferenceOr::Reference {
            reference: "#/components/parameters/alias".to_string(),
        };
        let resolved = resolver.parameter(&param).unwrap();
        let Parameter::Header { parameter_data, .. } = resolved else {
            panic!("expected a header parameter");
        };
        assert_eq!(parameter_data.name, "folderId");
    }

    #[test]
    fn test_detects_circular_reference() {
        let spec = spec_with_parameters(
            "    a:\n      $ref: '#/components/parameters/b'\n    b:\n      $ref: '#/components/parameters/a'\n",
        );
        let resolver = ReferenceResolver::new("orchestrator", &spec);
        let param = ReferenceOr::Reference {
            reference: "#/components/parameters/a".to_string(),
        };
        let err = resolver.parameter(&param).unwrap_err();
        assert!(err.to_string().contains("circular reference"));
        assert!(err.to_string().contains("'orchestrator'"));
    }

    #[test]
    fn test_missing_reference() {
        let spec = spec_with_parameters("    a:\n      name: a\n      in: query\n");
        let resolver = ReferenceResolver::new("orchestrator", &spec);
        let param = ReferenceOr::Reference {
            reference: "#/components/parameters/missing".to_string(),
        };
        let err = resolver.parameter(&param).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
