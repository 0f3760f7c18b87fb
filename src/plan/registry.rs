//! Caches the `MethodPlan`s built from one declarative description, so
//! repeated invocations never re-parse it.

use crate::error::Error;
use crate::plan::parser;
use crate::plan::MethodPlan;
use std::collections::HashMap;
use std::sync::Arc;

/// An immutable, parsed-once mapping from operation id to [`MethodPlan`].
/// Built by [`MethodPlanRegistry::parse`]; every subsequent lookup is a
/// table read, matching DESIGN NOTES' "proxy-by-reflection → descriptor
/// table" translation.
pub struct MethodPlanRegistry {
    plans: HashMap<String, Arc<MethodPlan>>,
}

impl MethodPlanRegistry {
    /// Parses `description` once into a full set of plans. No partial
    /// registry is ever published: if any operation fails to parse, the
    /// whole call fails.
    ///
    /// # Errors
    /// Returns [`Error::BadDescription`] if the description itself, or any
    /// operation within it, is inconsistent.
    pub fn parse(description: &str) -> Result<Self, Error> {
        let document = parser::parse_document(description)?;
        let plans = parser::build_plans(&document)?;
        let plans = plans
            .into_iter()
            .map(|plan| (plan.operation_id.clone(), Arc::new(plan)))
            .collect();
        Ok(Self { plans })
    }

    /// Builds a registry directly from already-built plans, e.g. ones
    /// assembled programmatically rather than parsed from a description.
    #[must_use]
    pub fn from_plans(plans: Vec<MethodPlan>) -> Self {
        Self {
            plans: plans
                .into_iter()
                .map(|plan| (plan.operation_id.clone(), Arc::new(plan)))
                .collect(),
        }
    }

    /// Builds a registry directly from an already-parsed `OpenAPI` document,
    /// for callers that parsed it themselves (e.g. to inspect it first).
    ///
    /// # Errors
    /// Returns [`Error::BadDescription`] under the same conditions as [`Self::parse`].
    pub fn from_document(document: &openapiv3::OpenAPI) -> Result<Self, Error> {
        let plans = parser::build_plans(document)?
            .into_iter()
            .map(|plan| (plan.operation_id.clone(), Arc::new(plan)))
            .collect();
        Ok(Self { plans })
    }

    /// Pure lookup by operation id.
    #[must_use]
    pub fn get(&self, operation_id: &str) -> Option<Arc<MethodPlan>> {
        self.plans.get(operation_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    #[must_use]
    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
openapi: 3.0.0
info: { title: Test, version: "1.0" }
servers:
  - url: https://api.example.com
paths:
  /items/{id}:
    get:
      operationId: getItem
      parameters:
        - name: id
          in: path
          required: true
          schema: { type: string }
      responses:
        "200": { description: ok }
"#;

    #[test]
    fn parses_once_and_looks_up_by_operation_id() {
        let registry = MethodPlanRegistry::parse(SPEC).unwrap();
        assert_eq!(registry.len(), 1);
        let plan = registry.get("getItem").unwrap();
        assert_eq!(plan.verb, crate::http::Verb::Get);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn bad_description_fails_without_publishing_partial_plans() {
        let err = MethodPlanRegistry::parse("not: [valid, openapi").unwrap_err();
        assert_eq!(err.kind(), "BadDescription");
    }
}
