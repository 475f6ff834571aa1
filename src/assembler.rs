//! Assembly of resolved route files into [`ApiDefinition`] records.

use crate::error::{Error, Result};
use crate::parser::{ImportBinding, Literal};
use crate::printer::print_expression;
use crate::resolver::{
    Resolution, Resolved, ResolvedParameter, RetainedDeclaration, ERROR_STATUSES_FIELD,
};
use crate::scanner::{HttpMethod, RouteFile};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Status codes accepted in `errorStatuses`.
const STATUS_RANGE: RangeInclusive<i64> = 100..=599;

/// Definition fields with a fixed slot in the assembled record.
const KNOWN_FIELDS: [&str; 8] = [
    "alias",
    "description",
    "method",
    "path",
    "parameters",
    "response",
    "errors",
    ERROR_STATUSES_FIELD,
];

/// Where a request parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Body,
    Header,
}

impl ParameterLocation {
    /// Parses a `type` value, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "body" => Some(ParameterLocation::Body),
            "header" => Some(ParameterLocation::Header),
            _ => None,
        }
    }

    /// Spelling used by zodios parameter objects.
    pub fn zodios_type(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "Path",
            ParameterLocation::Query => "Query",
            ParameterLocation::Body => "Body",
            ParameterLocation::Header => "Header",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Schema expression, printed on one line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// A definition field without a fixed slot, kept as a verbatim expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraField {
    pub key: String,
    pub value: String,
}

/// One route's API definition.
///
/// `method` and `path` always come from the route file's location. Schema
/// valued fields hold rewritten, single-line expression text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    pub parameters: Vec<Parameter>,
    /// Verbatim `parameters` expression when it is not an inline list of
    /// parameter objects (e.g. a shared helper array). `parameters` is empty
    /// whenever this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_expression: Option<String>,
    pub response: String,
    /// One catalog lookup per declared status, e.g. `ResponseSchemas[404]`
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<ExtraField>,
}

/// Settings the assembler needs from the build configuration.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Identifier of the shared error schema catalog
    pub catalog: String,
    /// Response expression used when a definition declares none
    pub default_response: String,
}

/// A route file ready for emission.
#[derive(Debug, Clone)]
pub struct AssembledRoute {
    pub route: RouteFile,
    pub definition: ApiDefinition,
    pub helpers: Vec<RetainedDeclaration>,
    pub imports: Vec<ImportBinding>,
}

/// Builds the definition record of a resolved endpoint file.
///
/// An `alias` or `description` that is not a string literal is carried as a
/// verbatim expression field, like any unrecognized field.
///
/// # Errors
///
/// Returns [`Error::InvalidErrorStatuses`] if `errorStatuses` is not an array
/// of integer status codes, and [`Error::ParseError`] if a rewritten
/// expression no longer parses.
pub fn assemble(
    route: &RouteFile,
    method: HttpMethod,
    resolution: Resolution,
    options: &AssemblyOptions,
) -> Result<AssembledRoute> {
    let file = &route.relative_path;

    for key in ["method", "path"] {
        if resolution.get(key).is_some() {
            debug!(
                "Ignoring `{}` declared in {}, using the file location",
                key,
                file.display()
            );
        }
    }
    if resolution.get("errors").is_some() {
        warn!(
            "Ignoring `errors` declared in {}, use `{}` instead",
            file.display(),
            ERROR_STATUSES_FIELD
        );
    }

    let structured = match &resolution.parameters {
        Some(entries) => structured_parameters(route, entries)?,
        None => None,
    };
    let (parameters, parameters_expression) = match (structured, resolution.get("parameters")) {
        (Some(parameters), _) => (parameters, None),
        (None, Some(expression)) => (Vec::new(), Some(print_expression(file, &expression.text)?)),
        (None, None) => (Vec::new(), None),
    };

    let errors = match resolution.get(ERROR_STATUSES_FIELD) {
        Some(statuses) => error_references(route, statuses, &options.catalog)?,
        None => Vec::new(),
    };

    let mut extra = Vec::new();
    for (key, value) in &resolution.properties {
        let carried = match key.as_str() {
            "alias" | "description" => !matches!(value.literal, Literal::String(_)),
            other => !KNOWN_FIELDS.contains(&other),
        };
        if carried {
            extra.push(ExtraField {
                key: key.clone(),
                value: print_expression(file, &value.text)?,
            });
        }
    }

    let response = match resolution.get("response") {
        Some(response) => print_expression(file, &response.text)?,
        None => options.default_response.clone(),
    };

    let definition = ApiDefinition {
        alias: string_field(&resolution, "alias"),
        description: string_field(&resolution, "description"),
        method,
        path: route.path.clone(),
        parameters,
        parameters_expression,
        response,
        errors,
        extra,
    };

    Ok(AssembledRoute {
        route: route.clone(),
        definition,
        helpers: resolution.helpers,
        imports: resolution.imports,
    })
}

fn string_field(resolution: &Resolution, key: &str) -> Option<String> {
    match &resolution.get(key)?.literal {
        Literal::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn error_references(route: &RouteFile, statuses: &Resolved, catalog: &str) -> Result<Vec<String>> {
    let Literal::Integers(codes) = &statuses.literal else {
        return Err(Error::InvalidErrorStatuses {
            file: route.relative_path.clone(),
            message: format!("expected an array of integer literals, got `{}`", statuses.text),
        });
    };
    codes
        .iter()
        .map(|code| {
            if STATUS_RANGE.contains(code) {
                Ok(format!("{}[{}]", catalog, code))
            } else {
                Err(Error::InvalidErrorStatuses {
                    file: route.relative_path.clone(),
                    message: format!("{} is not an HTTP status code", code),
                })
            }
        })
        .collect()
}

/// Structured view of an inline parameter list. `None` when an entry has a
/// `name`, `type` or `description` that is not a string literal, in which case
/// the list is emitted verbatim.
fn structured_parameters(
    route: &RouteFile,
    entries: &[ResolvedParameter],
) -> Result<Option<Vec<Parameter>>> {
    let file = &route.relative_path;
    let mut parameters = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(Literal::String(name)) = entry.name.as_ref().map(|n| &n.literal) else {
            debug!(
                "Parameter without a literal name in {}, keeping the list verbatim",
                file.display()
            );
            return Ok(None);
        };

        let location = match entry.location.as_ref().map(|l| &l.literal) {
            Some(Literal::String(value)) => ParameterLocation::parse(value).unwrap_or_else(|| {
                warn!(
                    "Unknown parameter type `{}` for `{}` in {}, using query",
                    value,
                    name,
                    file.display()
                );
                ParameterLocation::Query
            }),
            Some(_) => {
                debug!(
                    "Type of `{}` in {} is not a string literal, keeping the list verbatim",
                    name,
                    file.display()
                );
                return Ok(None);
            }
            None => {
                warn!("Parameter `{}` in {} has no type, using query", name, file.display());
                ParameterLocation::Query
            }
        };

        let description = match entry.description.as_ref().map(|d| &d.literal) {
            Some(Literal::String(s)) => Some(s.clone()),
            Some(_) => {
                debug!(
                    "Description of `{}` in {} is not a string literal, keeping the list verbatim",
                    name,
                    file.display()
                );
                return Ok(None);
            }
            None => None,
        };

        let schema = match &entry.schema {
            Some(schema) => Some(print_expression(file, &schema.text)?),
            None => None,
        };

        parameters.push(Parameter {
            name: name.clone(),
            location,
            description,
            schema,
        });
    }
    Ok(Some(parameters))
}
