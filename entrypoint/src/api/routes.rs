pub(crate) mod error_message_erasure;
pub(crate) mod photo;
pub(crate) mod status;
