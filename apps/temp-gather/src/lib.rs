pub mod auth;
pub mod cli;
pub mod config;
pub mod datastore;
pub mod error;
pub mod gather;
pub mod net;

#[cfg(test)]
pub mod test_support;
