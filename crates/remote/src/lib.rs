//! Remote access adapter for the vconnect backend.
//!
//! Normalization happens entirely at this boundary: raw rows are decoded
//! through the lenient core-types deserializers (field-name variants, mixed
//! id types, sloppy timestamps), and rows that are not even objects are
//! dropped with a warning. Nothing un-normalized ever reaches the cache.

pub mod http;
pub mod port;

pub use http::{HttpRemote, RemoteConfig};
pub use port::{RemoteError, RemotePort};
