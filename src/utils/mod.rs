mod buffer;
mod client;
mod config;
mod constants;
mod operations;
mod outcome;
mod pacer;
mod request;
mod session;
mod status;
#[cfg(test)]
mod testing;
mod transport;
mod upload;

pub use buffer::*;
pub use client::*;
pub use config::*;
pub use constants::*;
pub use operations::*;
pub use outcome::*;
pub use pacer::*;
pub use request::*;
pub use session::*;
pub use status::*;
pub use transport::*;
pub use upload::*;
