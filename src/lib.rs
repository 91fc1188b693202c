//! Queue event relay: consumes one queued event per invocation, enforces its time-to-live,
//! forwards it downstream with a cached OAuth 2.0 bearer token, and requeues failures with a
//! bounded, linearly delayed retry counter.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod config;
#[cfg(feature = "reqwest")] pub mod credential;
pub mod downstream;
pub mod error;
pub mod event;
pub mod expiry;
#[cfg(feature = "reqwest")] pub mod http;
pub mod obs;
pub mod processor;
pub mod requeue;
pub mod retry;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
