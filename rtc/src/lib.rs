//! # Shared-key secure media transport
//!
//! This crate turns an established connectivity layer into an encrypted
//! channel for RTP and RTCP. Unlike a DTLS transport, the SRTP/SRTCP session
//! keys are exported from a secret the whole group shares, typically handed
//! out by a group key agreement, and can be rotated without tearing the
//! transport down.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use rtc_secure_transport::api::APIBuilder;
//! use rtc_secure_transport::transport::{GroupKeyAgreement, SecurityParameters, SecurityTransport};
//!
//! let api = APIBuilder::new()
//!     .with_session_backend(backend)
//!     .build()?;
//!
//! let transport = Arc::new(api.new_shared_transport(Some(ice_transport), None));
//! transport.update_keys(&group_exporter).await?;
//! transport.start(SecurityParameters::default()).await?;
//!
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let writer = api.new_srtp_writer_future(ssrc, RtpCodecKind::Video, transport.clone(), stop_rx);
//! writer.write_rtp(&header, &payload).await?;
//! ```
//!
//! ## Delivery paths
//!
//! By default packets are protected and sent over the endpoints the ICE
//! transport hands out. With relay delivery enabled in the
//! [`SettingEngine`](configuration::setting_engine::SettingEngine), writers
//! protect packets locally and pass the ciphertext to a
//! [`RelayClient`](relay::RelayClient) instead.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod api;
pub mod configuration;
pub mod relay;
pub mod rtp_transceiver;
pub mod transport;
