pub mod cache;
pub mod kv;
pub mod record;
