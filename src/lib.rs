pub mod captions;
pub mod config;
pub mod datastore;
pub mod http_api;
pub mod realtime;
pub mod speech;
pub mod translation;
mod util;

pub use config::ConfigSet;
pub use util::now_ms;
