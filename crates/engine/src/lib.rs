pub mod catalog;
pub mod categories;
pub mod config;
pub mod deletion;
pub mod error;
pub mod logging;
pub mod mirror;
pub mod notice;
pub mod product_form;

pub use catalog::Catalog;
pub use categories::CategorySession;
pub use config::{CatalogConfig, ConfigError, LoggingConfig, StoreConfig};
pub use deletion::ProductDeletion;
pub use error::EngineError;
pub use mirror::{LiveCollection, MirrorView, decode_snapshot};
pub use notice::{Notice, NoticeLevel};
pub use product_form::{FormMode, ProductEditSession, SubmitOutcome};
