//! Sets `User-Agent` to the pipeline's configured string unless the caller
//! already set one.

use crate::constants::HEADER_USER_AGENT;
use crate::error::Error;
use crate::http::HttpResponse;
use crate::policy::{Next, Policy, PolicyContext};
use async_trait::async_trait;

pub struct UserAgentPolicy;

#[async_trait]
impl Policy for UserAgentPolicy {
    async fn process(&self, ctx: &mut PolicyContext, next: Next<'_>) -> Result<HttpResponse, Error> {
        let user_agent = ctx.options.user_agent.clone();
        ctx.request.headers.set_if_absent(HEADER_USER_AGENT, user_agent);
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "UserAgentPolicy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, Verb};
    use crate::policy::PipelineOptions;
    use crate::transport::Transport;
    use std::sync::Arc;

    struct EchoTransport;
    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
            Ok(HttpResponse::from_bytes(
                200,
                crate::http::HttpHeaders::new(),
                bytes::Bytes::new(),
                Arc::new(request.snapshot()),
            ))
        }
    }

    #[tokio::test]
    async fn sets_user_agent_when_absent() {
        let request = HttpRequest::new(Verb::Get, "https://example.test/");
        let options = Arc::new(PipelineOptions {
            user_agent: "test-agent/1.0".to_string(),
            ..PipelineOptions::default()
        });
        let mut ctx = PolicyContext::new(request, options);
        let policies: Vec<Arc<dyn Policy>> = vec![Arc::new(UserAgentPolicy)];
        let transport = EchoTransport;
        let pipeline = crate::policy::Pipeline::new(
            policies,
            Arc::new(transport),
            crate::policy::PipelineOptions::default(),
        );
        let response = pipeline.send(&mut ctx).await.unwrap();
        assert_eq!(
            response.request.headers.get(HEADER_USER_AGENT),
            Some("test-agent/1.0")
        );
    }
}
