pub mod auth;
pub mod backend;
pub mod config;
pub mod feed;
pub mod guard;
pub mod profile;

#[cfg(test)]
mod testing;
