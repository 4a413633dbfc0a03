pub mod client;
pub mod errors;
pub mod photo_source;
pub mod request;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_server;
