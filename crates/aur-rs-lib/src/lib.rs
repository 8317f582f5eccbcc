pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::AurRsConfig;

pub mod version;
pub mod constraint;

pub mod registry;
pub use registry::PackageRecord;
pub use registry::Registry;

pub mod local_index;
pub use local_index::LocalIndex;

pub mod dependency_resolver;
pub mod installer;
