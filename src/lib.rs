//! An asynchronous HTTP client runtime that turns a declaratively-described
//! REST API surface into executable network calls.
//!
//! A [`plan::MethodPlan`] describes one REST operation (verb, URL template,
//! parameter bindings, expected status codes, body/response types, error
//! mapping) once, either parsed from an OpenAPI document
//! ([`plan::registry::MethodPlanRegistry::parse`]) or built by hand. Every
//! invocation of that operation ([`client::ApiClient::invoke`]) turns the
//! plan plus call-site arguments into a typed [`http::HttpRequest`], pushes
//! it through a user-configurable [`policy::Pipeline`], decodes the
//! response into a typed value, and surfaces failures as structured
//! [`error::Error`]s.
//!
//! ```no_run
//! use relay_runtime::client::{ApiClient, PipelineBuilder};
//! use relay_runtime::builder::{ArgValue, CallArgs};
//! use relay_runtime::plan::MethodPlanRegistry;
//! use relay_runtime::transport::ReqwestTransport;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), relay_runtime::error::Error> {
//! let registry = Arc::new(MethodPlanRegistry::parse(include_str!("../demos/petstore.yaml"))?);
//! let pipeline = Arc::new(PipelineBuilder::new().build(Arc::new(ReqwestTransport::default())));
//! let client = ApiClient::new(registry, pipeline, Arc::new(relay_runtime::codec::DefaultCodec));
//!
//! let args = CallArgs::new().with("id", ArgValue::Text("123".to_string()));
//! let result = client.invoke("getPet", args).await?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod codec;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod http;
pub mod invocation;
pub mod logging;
pub mod plan;
pub mod policy;
pub mod resume;
pub mod transport;
pub mod url;

pub use client::{ApiClient, PipelineBuilder};
pub use codec::{Codec, DefaultCodec};
pub use error::Error;
pub use http::{HttpHeaders, HttpRequest, HttpResponse, Verb};
pub use invocation::{InvocationOptions, InvocationResult};
pub use plan::{MethodPlan, MethodPlanRegistry};
pub use policy::{Pipeline, PipelineOptions, Policy, PolicyContext};
pub use transport::{ReqwestTransport, Transport};
