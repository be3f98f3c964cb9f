#[cfg(feature = "network")]
pub mod api;
pub mod cache;
pub mod endpoint;
pub mod error;
pub mod model;
pub mod overrides;
pub mod price;
pub mod refresh;

#[cfg(feature = "network")]
pub use api::OpenRouterClient;
pub use cache::CacheStore;
pub use endpoint::{Endpoint, ModelEndpoint, ModelEndpoints, SelectedEndpoints};
pub use error::OrcError;
pub use model::{CompatibleModelInfo, ModelInfo, ModelInfoMap};
pub use overrides::OverrideTable;
pub use refresh::{EndpointsSource, RefreshService};
