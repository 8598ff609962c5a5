pub mod db;
pub mod entries;
pub mod models;
pub mod qdrant;
pub mod schema;
pub mod sessions;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
