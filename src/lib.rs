pub mod brief;
pub mod clients;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod prompts;
pub mod service;
pub mod store;

pub use brief::{Brief, BriefRequest, RawCandidate};
pub use error::{BriefError, Result};
