//! Core domain types and traits for thing persistence.

pub mod config;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod thing;
pub mod traits;
pub mod translate;

pub use config::{DatabaseConfig, ThingsConfig};
pub use error::{BoxError, ErrorKind, ThingsError, ThingsResult};
pub use ids::{ChannelId, ThingId};
pub use thing::{Metadata, Page, PageMetadata, Thing};
pub use traits::ThingRepository;
pub use translate::{translate, ClassifyStoreError, Operation, StoreErrorCode};
