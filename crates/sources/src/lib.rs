//! Patent and trend data sources for WindowScout.
//!
//! Every adapter implements `windowscout_core::PatentSearch` or
//! `windowscout_core::TrendData`. The factory picks one from configuration,
//! falling back to the deterministic mocks when the chosen service has no key.

pub mod factory;
pub mod http;
pub mod mock;
pub mod serpapi;
pub mod uspto;

pub use factory::{build_patent_search, build_trend_data};
pub use http::RetryPolicy;
pub use mock::{MockPatentSearch, MockTrendData};
pub use serpapi::{SerpApiPatents, SerpApiTrends};
pub use uspto::UsptoPatents;
