//! Minimal end-to-end usage: parse a description, build a pipeline with the
//! default policy set, and invoke one operation.

use relay_runtime::builder::{ArgValue, CallArgs};
use relay_runtime::client::{ApiClient, PipelineBuilder};
use relay_runtime::codec::DefaultCodec;
use relay_runtime::transport::ReqwestTransport;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), relay_runtime::Error> {
    tracing_subscriber::fmt::init();

    let description = include_str!("petstore.yaml");
    let pipeline = Arc::new(
        PipelineBuilder::new()
            .with_default_unauthenticated()
            .build(Arc::new(ReqwestTransport::default())),
    );
    let client = ApiClient::from_description(description, pipeline, Arc::new(DefaultCodec))?;

    let args = CallArgs::new().with("id", ArgValue::Text("1".to_string()));
    match client.invoke("getPet", args).await {
        Ok(result) => println!("{result:?}"),
        Err(err) => eprintln!("call failed: {err}"),
    }

    Ok(())
}
