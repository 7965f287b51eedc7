//! Server-to-client messages.
//!
//! Only `ctrl` is correlated with a request (through `id`); everything else
//! is pushed by the server on its own schedule. Fields the client never
//! reads are ignored during decoding.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    Blob,
    errors::{ProtocolError, Result},
};

/// Ctrl parameters; each value is an independent JSON document.
pub type Params = BTreeMap<String, Blob>;

/// One message from the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMessage {
    /// Acknowledgement of a request.
    Ctrl(Ctrl),
    /// Message published to a topic.
    Data(Data),
    /// Presence change.
    Pres(Pres),
    /// Forwarded notification (read, received, key press).
    Info(Info),
    /// Topic metadata.
    Meta(Meta),
}

impl ServerMessage {
    /// Decode one wire message.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Decode` for malformed JSON or an unknown message kind
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    /// Wire name of the message kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ctrl(_) => "ctrl",
            Self::Data(_) => "data",
            Self::Pres(_) => "pres",
            Self::Info(_) => "info",
            Self::Meta(_) => "meta",
        }
    }
}

/// `{ctrl}`: status of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ctrl {
    /// Id of the request being acknowledged.
    #[serde(default)]
    pub id: Option<String>,
    /// Topic the request addressed.
    #[serde(default)]
    pub topic: Option<String>,
    /// HTTP-like status code.
    pub code: u16,
    /// Status text.
    #[serde(default)]
    pub text: String,
    /// Extra response values.
    #[serde(default)]
    pub params: Option<Params>,
}

/// True for ack codes in the success range (`200..400`).
pub const fn is_success_code(code: u16) -> bool {
    code >= 200 && code < 400
}

impl Ctrl {
    /// True when the ack reports success.
    pub const fn is_success(&self) -> bool {
        is_success_code(self.code)
    }
}

/// `{data}`: published content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Data {
    /// Topic the message was published to.
    pub topic: String,
    /// Sender; absent for server-generated messages.
    #[serde(default)]
    pub from: Option<String>,
    /// Sequence id within the topic.
    #[serde(default)]
    pub seq: u64,
    /// Message content.
    #[serde(default)]
    pub content: Option<Blob>,
}

/// `{pres}`: presence notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pres {
    /// Topic affected.
    pub topic: String,
    /// Topic or user the event is about.
    #[serde(default)]
    pub src: Option<String>,
    /// Event kind (`on`, `off`, `msg`, ...).
    pub what: String,
    /// Sequence id, for `msg` events.
    #[serde(default)]
    pub seq: Option<u64>,
}

/// `{info}`: forwarded client notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Info {
    /// Topic the notification relates to.
    pub topic: String,
    /// User who sent the notification.
    pub from: String,
    /// Notification kind.
    pub what: String,
    /// Sequence id being reported.
    #[serde(default)]
    pub seq: Option<u64>,
}

/// `{meta}`: metadata response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Meta {
    /// Id of the request that asked for it.
    #[serde(default)]
    pub id: Option<String>,
    /// Topic described.
    #[serde(default)]
    pub topic: String,
    /// Topic descriptor.
    #[serde(default)]
    pub desc: Option<Blob>,
    /// Subscriptions.
    #[serde(default)]
    pub sub: Vec<Blob>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Deleted ranges.
    #[serde(default)]
    pub del: Option<Blob>,
    /// Credentials.
    #[serde(default)]
    pub cred: Vec<Blob>,
}
