/// The outer envelope of one dnstap observation. `type` distinguishes
/// payload kinds; only `MESSAGE` envelopes carry a [`Message`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Dnstap {
    /// DNS server identity, e.g. a hostname.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub identity: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,

    /// DNS server version string.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub version: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,

    /// Extra sender-specific data.
    #[prost(bytes = "vec", optional, tag = "3")]
    pub extra: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,

    #[prost(message, optional, tag = "14")]
    pub message: ::core::option::Option<Message>,

    #[prost(enumeration = "DnstapType", required, tag = "15")]
    pub r#type: i32,
}

/// Identifies the kind of payload the envelope carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DnstapType {
    Message = 1,
}

/// One captured DNS transaction observation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(enumeration = "message::Type", required, tag = "1")]
    pub r#type: i32,

    #[prost(enumeration = "SocketFamily", optional, tag = "2")]
    pub socket_family: ::core::option::Option<i32>,

    #[prost(enumeration = "SocketProtocol", optional, tag = "3")]
    pub socket_protocol: ::core::option::Option<i32>,

    /// Network-order address of the far end (the client for CLIENT_*
    /// messages, the upstream server for RESOLVER_* messages).
    #[prost(bytes = "vec", optional, tag = "4")]
    pub query_address: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,

    #[prost(bytes = "vec", optional, tag = "5")]
    pub response_address: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,

    #[prost(uint32, optional, tag = "6")]
    pub query_port: ::core::option::Option<u32>,

    #[prost(uint32, optional, tag = "7")]
    pub response_port: ::core::option::Option<u32>,

    #[prost(uint64, optional, tag = "8")]
    pub query_time_sec: ::core::option::Option<u64>,

    #[prost(fixed32, optional, tag = "9")]
    pub query_time_nsec: ::core::option::Option<u32>,

    /// Raw DNS query message in wire format.
    #[prost(bytes = "vec", optional, tag = "10")]
    pub query_message: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,

    /// Bailiwick zone of the response, wire format.
    #[prost(bytes = "vec", optional, tag = "11")]
    pub query_zone: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,

    #[prost(uint64, optional, tag = "12")]
    pub response_time_sec: ::core::option::Option<u64>,

    #[prost(fixed32, optional, tag = "13")]
    pub response_time_nsec: ::core::option::Option<u32>,

    /// Raw DNS response message in wire format.
    #[prost(bytes = "vec", optional, tag = "14")]
    pub response_message: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

pub mod message {
    /// Where in the resolution path a message was observed, and whether it
    /// is the query or the response half of the transaction.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        AuthQuery = 1,
        AuthResponse = 2,
        ResolverQuery = 3,
        ResolverResponse = 4,
        ClientQuery = 5,
        ClientResponse = 6,
        ForwarderQuery = 7,
        ForwarderResponse = 8,
        StubQuery = 9,
        StubResponse = 10,
        ToolQuery = 11,
        ToolResponse = 12,
        UpdateQuery = 13,
        UpdateResponse = 14,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SocketFamily {
    Inet = 1,
    Inet6 = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SocketProtocol {
    Udp = 1,
    Tcp = 2,
    Dot = 3,
    Doh = 4,
    DnsCryptUdp = 5,
    DnsCryptTcp = 6,
    Doq = 7,
}
