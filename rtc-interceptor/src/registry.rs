//! Interceptor Registry - builder for constructing interceptor chains.

use std::sync::Arc;

use async_trait::async_trait;
use shared::error::{flatten_errs, Result};

use crate::{Interceptor, RTCPReader, RTPReader, StreamInfo};

/// Registry collects interceptors and builds them into a [`Chain`].
///
/// # Example
///
/// ```ignore
/// use rtc_interceptor::Registry;
///
/// let chain = Registry::new()
///     .with(Arc::new(PacketCounter::default()))
///     .with(Arc::new(FeedbackGenerator::default()))
///     .build();
/// ```
#[derive(Default)]
pub struct Registry {
    interceptors: Vec<Arc<dyn Interceptor + Send + Sync>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Add an interceptor. Interceptors added later wrap the readers of the
    /// ones added before them.
    pub fn with(mut self, interceptor: Arc<dyn Interceptor + Send + Sync>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> Chain {
        Chain::new(self.interceptors)
    }
}

/// Chain interceptor runs every bind call through all interceptors in order.
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor + Send + Sync>>,
}

impl Chain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor + Send + Sync>>) -> Self {
        Chain { interceptors }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

#[async_trait]
impl Interceptor for Chain {
    async fn bind_rtcp_reader(
        &self,
        mut reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync> {
        for interceptor in &self.interceptors {
            reader = interceptor.bind_rtcp_reader(reader).await;
        }
        reader
    }

    async fn bind_remote_stream(
        &self,
        info: &StreamInfo,
        mut reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync> {
        log::trace!(
            "binding remote stream ssrc={} through {} interceptors",
            info.ssrc,
            self.interceptors.len()
        );
        for interceptor in &self.interceptors {
            reader = interceptor.bind_remote_stream(info, reader).await;
        }
        reader
    }

    async fn unbind_remote_stream(&self, info: &StreamInfo) {
        for interceptor in &self.interceptors {
            interceptor.unbind_remote_stream(info).await;
        }
    }

    /// close closes every interceptor, even when an earlier one fails.
    async fn close(&self) -> Result<()> {
        let mut errs = vec![];
        for interceptor in &self.interceptors {
            if let Err(err) = interceptor.close().await {
                errs.push(err);
            }
        }
        flatten_errs(errs)
    }
}
