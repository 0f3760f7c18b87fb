//! Parses a declarative OpenAPI description into `MethodPlan`s, once per
//! description.

use crate::error::Error;
use crate::http::Verb;
use crate::plan::{BodyWireType, ErrorDescriptor, HeaderBindingName, MethodPlan, ParamBinding, ReturnShape};
use crate::url::EncodingPolicy;
use openapiv3::{OpenAPI, Operation, Parameter, ReferenceOr};
use std::collections::BTreeSet;

/// Parses OpenAPI content (YAML or JSON, detected by leading `{`) into the
/// underlying `openapiv3` document.
///
/// # Errors
/// Returns [`Error::BadDescription`] if the content is neither valid YAML
/// nor valid JSON OpenAPI.
pub fn parse_document(content: &str) -> Result<OpenAPI, Error> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .map_err(|e| Error::bad_description(format!("invalid OpenAPI description: {e}")))
    } else {
        serde_yaml::from_str(content)
            .or_else(|_| serde_json::from_str(content))
            .map_err(|e| Error::bad_description(format!("invalid OpenAPI description: {e}")))
    }
}

/// Builds one `MethodPlan` per operation in `document`.
///
/// # Errors
/// Returns [`Error::BadDescription`] on a duplicate path placeholder, a
/// missing Path binding for a templated placeholder, more than one Body
/// binding, an empty expected-status set, or an unsupported body content type.
pub fn build_plans(document: &OpenAPI) -> Result<Vec<MethodPlan>, Error> {
    let base_url = document
        .servers
        .first()
        .map(|s| s.url.trim_end_matches('/').to_string())
        .unwrap_or_default();

    let mut plans = Vec::new();
    for (path, path_item) in &document.paths.paths {
        let ReferenceOr::Item(item) = path_item else {
            continue;
        };
        let operations: [(Verb, &Option<Operation>); 7] = [
            (Verb::Get, &item.get),
            (Verb::Post, &item.post),
            (Verb::Put, &item.put),
            (Verb::Patch, &item.patch),
            (Verb::Delete, &item.delete),
            (Verb::Head, &item.head),
            (Verb::Options, &item.options),
        ];

        for (verb, operation) in operations {
            let Some(operation) = operation else { continue };
            plans.push(build_plan(&base_url, verb, path, operation)?);
        }
    }
    Ok(plans)
}

fn build_plan(base_url: &str, verb: Verb, path: &str, operation: &Operation) -> Result<MethodPlan, Error> {
    let operation_id = operation
        .operation_id
        .clone()
        .unwrap_or_else(|| format!("{verb}_{path}"));

    let path_placeholders = extract_placeholders(path);
    let mut seen = BTreeSet::new();
    for name in &path_placeholders {
        if !seen.insert(name.clone()) {
            return Err(Error::bad_description(format!(
                "operation '{operation_id}': duplicate path placeholder '{{{name}}}'"
            )));
        }
    }

    let mut bindings = Vec::new();
    let mut bound_placeholders = BTreeSet::new();
    let mut body_binding_count = 0usize;

    for param_ref in &operation.parameters {
        let ReferenceOr::Item(param) = param_ref else {
            continue;
        };
        match to_binding(param) {
            Some(ParamBinding::Path { placeholder, encoding }) => {
                bound_placeholders.insert(placeholder.clone());
                bindings.push(ParamBinding::Path { placeholder, encoding });
            }
            Some(binding) => bindings.push(binding),
            None => {} // Cookie-location parameters are handled by the built-in cookie policy, not per-parameter.
        }
    }

    for name in &path_placeholders {
        if !bound_placeholders.contains(name) {
            return Err(Error::bad_description(format!(
                "operation '{operation_id}': path placeholder '{{{name}}}' has no Path binding"
            )));
        }
    }

    let mut request_content_type = None;
    if let Some(ReferenceOr::Item(body)) = &operation.request_body {
        body_binding_count += 1;
        let content_type = body
            .content
            .keys()
            .find(|k| k.as_str() == crate::constants::CONTENT_TYPE_JSON)
            .or_else(|| body.content.keys().next())
            .cloned();
        let wire_type = content_type
            .as_deref()
            .map_or(BodyWireType::Json, infer_wire_type_from_content_type);
        request_content_type = content_type;
        bindings.push(ParamBinding::Body { wire_type });
    }
    if body_binding_count > 1 {
        return Err(Error::bad_description(format!(
            "operation '{operation_id}': at most one Body binding is allowed"
        )));
    }

    let expected_status: BTreeSet<u16> = operation
        .responses
        .responses
        .keys()
        .filter_map(|code| match code {
            openapiv3::StatusCode::Code(n) => Some(*n),
            openapiv3::StatusCode::Range(_) => None,
        })
        .collect();
    if expected_status.is_empty() {
        return Err(Error::bad_description(format!(
            "operation '{operation_id}': expected status codes must be non-empty"
        )));
    }

    if let Some(content_type) = &request_content_type {
        if !is_syntactically_valid_media_type(content_type) {
            return Err(Error::bad_description(format!(
                "operation '{operation_id}': Content-Type '{content_type}' is not syntactically valid"
            )));
        }
    }

    let url_template = format!("{base_url}{path}");
    let return_shape = if matches!(verb, Verb::Head) {
        ReturnShape::Boolean
    } else {
        ReturnShape::Typed
    };

    Ok(MethodPlan {
        operation_id,
        verb,
        url_template,
        bindings,
        expected_status,
        error: ErrorDescriptor {
            error_type: format!("{verb}{path}Error"),
            error_body_type: None,
        },
        return_shape,
        response_wire_type: None,
        request_content_type,
    })
}

fn to_binding(param: &Parameter) -> Option<ParamBinding> {
    match param {
        Parameter::Path { parameter_data, .. } => Some(ParamBinding::Path {
            placeholder: parameter_data.name.clone(),
            encoding: EncodingPolicy::Encoded,
        }),
        Parameter::Query { parameter_data, .. } => Some(ParamBinding::Query {
            key: parameter_data.name.clone(),
            encoding: EncodingPolicy::Encoded,
        }),
        Parameter::Header { parameter_data, .. } => Some(ParamBinding::Header {
            name: HeaderBindingName::Fixed(parameter_data.name.clone()),
        }),
        Parameter::Cookie { .. } => None,
    }
}

fn extract_placeholders(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        names.push(rest[open + 1..open + close].to_string());
        rest = &rest[open + close + 1..];
    }
    names
}

/// A minimal `type/subtype` syntax check (RFC 6838 token grammar, without
/// parameters), enough to reject non-media-type garbage without pulling in a
/// dedicated MIME parser.
fn is_syntactically_valid_media_type(content_type: &str) -> bool {
    let media_type = crate::constants::media_type(content_type);
    let Some((type_part, subtype_part)) = media_type.split_once('/') else {
        return false;
    };
    let is_token = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c));
    is_token(type_part) && is_token(subtype_part)
}

fn infer_wire_type_from_content_type(content_type: &str) -> BodyWireType {
    if crate::constants::is_json_content_type(content_type) {
        BodyWireType::Json
    } else if content_type == crate::constants::CONTENT_TYPE_OCTET_STREAM {
        BodyWireType::Bytes
    } else {
        BodyWireType::Text
    }
}
