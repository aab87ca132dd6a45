//! Client side of a resumable, chunked upload protocol.
//!
//! A session is negotiated once ([`Uploader::initiate`]), then the payload is
//! streamed in fixed-size chunks ([`Uploader::upload`]). Every network call
//! goes through a shared [`Pacer`]; [`Uploader::transfer_status`] and
//! [`Uploader::resume`] recover sessions interrupted mid-transfer.

pub mod error;
pub mod utils;

pub use error::UploadError;
pub use utils::*;

pub type Result<T, E = UploadError> = std::result::Result<T, E>;
