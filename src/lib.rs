#![doc(html_root_url = "https://docs.rs/wirelink/latest")]
//! Public API for the `wirelink` library.
//!
//! This crate provides a client-side network stack: a reconnecting
//! connection manager over TCP, UDP and WebSocket, pluggable framing codecs,
//! payload and package builders for a JSON and a binary scheme, and an
//! action-routed dispatcher that replies on behalf of its handlers.

pub mod action;
pub mod client;
pub mod codec;
pub mod data;
pub mod metrics;
pub mod package;
pub mod panic;
pub mod provider;
pub mod service;

pub use action::{Action, ActionId};
pub use client::{Client, ClientBuilder, ClientConfig, ClientError, Network};
pub use codec::{Codec, CodecError, FrameCodec};
pub use data::{DataBuilder, Scheme};
pub use metrics::{CONNECTIONS_ACTIVE, Direction, FRAMES_PROCESSED};
pub use package::{Package, PackageBuilder};
pub use provider::{Provider, ProviderConfig};
pub use service::{Reply, Service, ServiceBuilder, ServiceError};
