// diradmin-api: Async Rust client for the DirectAdmin control panel API
//
// Leaf layer of the workspace: credentials, transport, response decoding
// and the authenticated `Connection`. Contexts and the account model live
// in `diradmin-core`.

pub mod codec;
pub mod connection;
pub mod conversion;
pub mod credential;
pub mod error;
pub mod transport;

pub use codec::{ResponseCodec, UNLIMITED};
pub use connection::{ApiEndpoints, Connection, Method, RequestOptions};
pub use credential::Credential;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
