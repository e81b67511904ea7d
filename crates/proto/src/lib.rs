//! The dnstap wire schema.
//!
//! Message and enum definitions for the dnstap protobuf schema, kept in
//! prost-build output form but maintained by hand so the build does not
//! depend on protoc. The schema is fixed externally; only add fields, never
//! renumber.

mod dnstap;

pub use dnstap::{message, Dnstap, DnstapType, Message, SocketFamily, SocketProtocol};

/// Content type identifier the frame-streams handshake must carry for a
/// stream of serialized [`Dnstap`] payloads.
pub const CONTENT_TYPE: &[u8] = b"protobuf:dnstap.Dnstap";
