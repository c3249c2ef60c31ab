pub mod params;
pub mod schema;
pub mod selectors;

pub use params::{ParamDef, Params};
pub use schema::{
    BrowserConfig, Config, ExtractionConfig, LoginConfig, OnFailure, RetryConfig, TargetConfig,
    Viewport,
};
pub use selectors::{MetaProbe, Selectors, Timing};
