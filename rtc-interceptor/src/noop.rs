use std::sync::Arc;

use async_trait::async_trait;
use shared::error::Result;

use crate::{Interceptor, RTCPReader, RTPReader, StreamInfo};

/// NoopInterceptor hands every reader back unchanged.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoopInterceptor;

impl NoopInterceptor {
    pub fn new() -> Self {
        NoopInterceptor
    }
}

#[async_trait]
impl Interceptor for NoopInterceptor {
    async fn bind_rtcp_reader(
        &self,
        reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync> {
        reader
    }

    async fn bind_remote_stream(
        &self,
        _info: &StreamInfo,
        reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync> {
        reader
    }

    async fn unbind_remote_stream(&self, _info: &StreamInfo) {}

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
