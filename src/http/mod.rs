//! Value types for one HTTP exchange.

pub mod headers;
pub mod request;
pub mod response;

pub use headers::HttpHeaders;
pub use request::{BodyChunk, BodyStream, HttpRequest, RequestBody, Verb};
pub use response::HttpResponse;
