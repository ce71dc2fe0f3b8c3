//! loadkit: asynchronous script/stylesheet loading with named bundles.
//!
//! A [`BundleLoader`] loads groups of paths through a pluggable
//! [`ResourceLoader`] host and lets other code wait on (`ready`) or
//! manually settle (`done`) those groups by bundle id.
//!
//! ```ignore
//! use loadkit::{BundleLoader, FsLoader, LoadOptions, ReadyOptions};
//! use std::sync::Arc;
//!
//! let loader = BundleLoader::new(Arc::new(FsLoader::new("public")));
//! loader.load(["core.js", "core.css"], Some("core"), LoadOptions::new())?;
//! loader.ready("core", ReadyOptions::new().on_success(|| println!("core ready")));
//! ```

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod loaders;
pub mod manifest;
pub mod options;
pub mod registry;
pub mod resource;

pub use config::LoaderConfig;
pub use coordinator::{BundleLoader, LoadHandle, Settlement};
pub use error::{LoaderError, Result};
pub use loaders::{
    BlockingLoader, EventSink, FsLoader, HttpLoader, LoadEvent, ResourceLoader,
};
pub use manifest::{Manifest, ManifestReport};
pub use options::{LoadOptions, ReadyOptions};
pub use registry::BundleRegistry;
pub use resource::{OneOrMany, ResourceKind, ResourceRequest};
