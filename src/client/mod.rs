//! Client side of the token lifecycle: a session object, a pluggable
//! transport, and an interceptor that refreshes an expired access token at
//! most once per request.

mod api_client;
mod error;
mod interceptor;
mod session;
mod transport;

pub use api_client::*;
pub use error::*;
pub use interceptor::*;
pub use session::Session;
pub use transport::*;
