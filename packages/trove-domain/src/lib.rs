pub mod entry;
pub mod provenance;
pub mod query;
pub mod session;
pub mod title_match;
