mod client;
mod credential;
mod errors;
mod message;
pub mod models;
pub mod providers;
mod request;
mod serializer;
mod stream;

pub use client::*;
pub use credential::*;
pub use errors::*;
pub use message::*;
pub use request::*;
pub use serializer::*;
pub use stream::*;
