//! Client-to-server messages.
//!
//! Every request is a variant of [`Request`] wrapped in a [`ClientMessage`]
//! envelope. On the wire the variant name becomes the single top-level key
//! (`{"sub": {...}}`), and the envelope adds the optional `extra` block that
//! carries impersonation (`obo`).
//!
//! # Invariants
//!
//! - Every request except `note` carries its caller-assigned id on the wire.
//!   Notes are fire-and-forget: the server never acknowledges them, so their
//!   id stays local.
//! - Byte secrets are base64 strings on the wire; blobs are raw JSON.

use base64::Engine;
use serde::{Serialize, Serializer};

use crate::{
    Blob,
    errors::{ProtocolError, Result},
};

/// Envelope for one outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientMessage {
    /// The request itself.
    #[serde(flatten)]
    pub request: Request,

    /// Server-side impersonation block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Extra>,
}

/// Envelope fields outside the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extra {
    /// User the request acts on behalf of.
    #[serde(rename = "obo")]
    pub on_behalf_of: String,
}

impl ClientMessage {
    /// Wrap a request with no impersonation.
    pub fn new(request: Request) -> Self {
        Self { request, extra: None }
    }

    /// Wrap a request acting on behalf of `user`, when one is set.
    pub fn on_behalf_of(request: Request, user: Option<String>) -> Self {
        Self { request, extra: user.map(|on_behalf_of| Extra { on_behalf_of }) }
    }

    /// Acting user, if any.
    pub fn acting_user(&self) -> Option<&str> {
        self.extra.as_ref().map(|e| e.on_behalf_of.as_str())
    }

    /// Encode to wire JSON.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if serialization fails
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// All request kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Request {
    /// Session handshake.
    #[serde(rename = "hi")]
    Hello(Hello),
    /// Create or update an account.
    #[serde(rename = "acc")]
    Account(Account),
    /// Authenticate the session.
    #[serde(rename = "login")]
    Login(Login),
    /// Attach to (and optionally create or configure) a topic.
    #[serde(rename = "sub")]
    Subscribe(Subscribe),
    /// Detach from a topic.
    #[serde(rename = "leave")]
    Leave(Leave),
    /// Publish a message.
    #[serde(rename = "pub")]
    Publish(Publish),
    /// Query topic metadata or messages.
    #[serde(rename = "get")]
    Get(Get),
    /// Update topic metadata.
    #[serde(rename = "set")]
    Set(Set),
    /// Delete messages, a subscription or a topic.
    #[serde(rename = "del")]
    Delete(Delete),
    /// Send a notification.
    #[serde(rename = "note")]
    Note(Note),
}

impl Request {
    /// Caller-assigned correlation id.
    pub fn id(&self) -> &str {
        match self {
            Self::Hello(m) => &m.id,
            Self::Account(m) => &m.id,
            Self::Login(m) => &m.id,
            Self::Subscribe(m) => &m.id,
            Self::Leave(m) => &m.id,
            Self::Publish(m) => &m.id,
            Self::Get(m) => &m.id,
            Self::Set(m) => &m.id,
            Self::Delete(m) => &m.id,
            Self::Note(m) => &m.id,
        }
    }

    /// Wire name of the request kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Hello(_) => "hi",
            Self::Account(_) => "acc",
            Self::Login(_) => "login",
            Self::Subscribe(_) => "sub",
            Self::Leave(_) => "leave",
            Self::Publish(_) => "pub",
            Self::Get(_) => "get",
            Self::Set(_) => "set",
            Self::Delete(_) => "del",
            Self::Note(_) => "note",
        }
    }

    /// Target topic, for kinds that address one.
    pub fn topic(&self) -> Option<&str> {
        match self {
            Self::Hello(_) | Self::Account(_) | Self::Login(_) => None,
            Self::Subscribe(m) => m.topic.as_deref(),
            Self::Leave(m) => m.topic.as_deref(),
            Self::Publish(m) => m.topic.as_deref(),
            Self::Get(m) => m.topic.as_deref(),
            Self::Set(m) => m.topic.as_deref(),
            Self::Delete(m) => m.topic.as_deref(),
            Self::Note(m) => m.topic.as_deref(),
        }
    }
}

/// `{hi}`: protocol version, user agent and language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hello {
    /// Request id.
    pub id: String,
    /// Protocol version spoken by the client.
    pub ver: String,
    /// User agent string.
    #[serde(rename = "ua")]
    pub user_agent: String,
    /// Preferred language.
    pub lang: String,
}

/// `{acc}`: create a new account or update an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Request id.
    pub id: String,
    /// Account to update, or `new` to create one.
    pub user: String,
    /// Authentication scheme.
    pub scheme: String,
    /// Authentication secret.
    #[serde(serialize_with = "serialize_secret")]
    pub secret: Vec<u8>,
    /// Authenticate the session with the new account.
    #[serde(skip_serializing_if = "is_false")]
    pub login: bool,
    /// Discovery tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Account descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<SetDesc>,
    /// Credentials to validate.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cred: Vec<Credential>,
}

/// `{login}`: authenticate the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Login {
    /// Request id.
    pub id: String,
    /// Authentication scheme (`basic`, `token`, ...).
    pub scheme: String,
    /// Authentication secret.
    #[serde(serialize_with = "serialize_secret")]
    pub secret: Vec<u8>,
    /// Credentials to validate.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cred: Vec<Credential>,
}

/// `{sub}`: attach to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscribe {
    /// Request id.
    pub id: String,
    /// Topic name; left empty for the server to reject when unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Values to set while attaching.
    #[serde(rename = "set", skip_serializing_if = "Option::is_none")]
    pub set_query: Option<SetQuery>,
    /// Data to fetch while attaching.
    #[serde(rename = "get", skip_serializing_if = "Option::is_none")]
    pub get_query: Option<GetQuery>,
}

/// `{leave}`: detach from a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leave {
    /// Request id.
    pub id: String,
    /// Topic name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Also drop the subscription.
    #[serde(skip_serializing_if = "is_false")]
    pub unsub: bool,
}

/// `{pub}`: publish content to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publish {
    /// Request id.
    pub id: String,
    /// Topic name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Suppress the echo of this message to the sending session.
    #[serde(rename = "noecho", skip_serializing_if = "is_false")]
    pub no_echo: bool,
    /// Message content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Blob>,
}

/// `{get}`: query a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Get {
    /// Request id.
    pub id: String,
    /// Topic name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// What to fetch.
    #[serde(flatten)]
    pub query: GetQuery,
}

/// `{set}`: update topic metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Set {
    /// Request id.
    pub id: String,
    /// Topic name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// What to change.
    #[serde(flatten)]
    pub query: SetQuery,
}

/// `{del}`: delete something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delete {
    /// Request id.
    pub id: String,
    /// Topic name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// What is being deleted.
    pub what: DeleteWhat,
    /// Message ranges, for message deletion.
    #[serde(rename = "delseq", skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<SeqRange>,
    /// Subscriber, for subscription deletion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Delete for everyone rather than only for the caller.
    #[serde(skip_serializing_if = "is_false")]
    pub hard: bool,
}

/// `{note}`: key press, read or receipt notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    /// Local correlation id; not sent.
    #[serde(skip)]
    pub id: String,
    /// Topic name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Notification kind.
    pub what: NoteWhat,
    /// Sequence id being reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

/// Target of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeleteWhat {
    /// Messages in a topic.
    #[serde(rename = "msg")]
    Messages,
    /// One user's subscription.
    #[serde(rename = "sub")]
    Subscription,
    /// The whole topic.
    #[serde(rename = "topic")]
    Topic,
}

/// Notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteWhat {
    /// Key press.
    Kp,
    /// Messages read up to `seq`.
    Read,
    /// Messages received up to `seq`.
    Recv,
}

/// Half-open range of message sequence ids; a single id when `hi` is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeqRange {
    /// First id.
    pub low: u64,
    /// One past the last id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hi: Option<u64>,
}

impl SeqRange {
    /// Upper bound used for "every message".
    pub const ALL_HI: u64 = 0x08FF_FFFF;

    /// A single message id.
    pub const fn single(seq: u64) -> Self {
        Self { low: seq, hi: None }
    }

    /// Every message in the topic.
    pub const fn all() -> Self {
        Self { low: 1, hi: Some(Self::ALL_HI) }
    }
}

/// Fetch query. `what` is a space separated list (`desc sub data`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GetQuery {
    /// Sections to fetch.
    pub what: String,
}

/// Values to set on a topic or account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetQuery {
    /// Topic or account descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<SetDesc>,
    /// Subscription changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<SetSub>,
    /// Replacement tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl SetQuery {
    /// True when nothing would be changed.
    pub fn is_empty(&self) -> bool {
        self.desc.is_none() && self.sub.is_none() && self.tags.is_empty()
    }
}

/// Descriptor fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetDesc {
    /// Default access modes.
    #[serde(rename = "defacs", skip_serializing_if = "Option::is_none")]
    pub default_acs: Option<DefaultAcsMode>,
    /// Public value, visible to everyone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<Blob>,
    /// Private value, visible to the caller only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<Blob>,
}

impl SetDesc {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.default_acs.is_none() && self.public.is_none() && self.private.is_none()
    }
}

/// Default access modes for new subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DefaultAcsMode {
    /// Mode for authenticated users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// Mode for anonymous users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon: Option<String>,
}

/// Subscription changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetSub {
    /// Subscriber being changed; the caller when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// New access mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Credential such as `email:alice@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    /// Validation method.
    #[serde(rename = "meth")]
    pub method: String,
    /// Value to validate.
    #[serde(rename = "val")]
    pub value: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

fn serialize_secret<S: Serializer>(secret: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(secret))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn wire(message: &ClientMessage) -> Value {
        serde_json::from_str(&message.to_json().unwrap()).unwrap()
    }

    #[test]
    fn hello_uses_short_keys() {
        let message = ClientMessage::new(Request::Hello(Hello {
            id: "101".into(),
            ver: "0.22".into(),
            user_agent: "cli/1.0".into(),
            lang: "EN".into(),
        }));

        assert_eq!(
            wire(&message),
            json!({"hi": {"id": "101", "ver": "0.22", "ua": "cli/1.0", "lang": "EN"}})
        );
    }

    #[test]
    fn login_secret_is_base64() {
        let message = ClientMessage::new(Request::Login(Login {
            id: "7".into(),
            scheme: "basic".into(),
            secret: b"alice:pass".to_vec(),
            cred: Vec::new(),
        }));

        assert_eq!(
            wire(&message),
            json!({"login": {"id": "7", "scheme": "basic", "secret": "YWxpY2U6cGFzcw=="}})
        );
    }

    #[test]
    fn on_behalf_of_goes_into_extra() {
        let message = ClientMessage::on_behalf_of(
            Request::Leave(Leave { id: "3".into(), topic: Some("grp1".into()), unsub: true }),
            Some("usrAlice".into()),
        );

        assert_eq!(message.acting_user(), Some("usrAlice"));
        assert_eq!(
            wire(&message),
            json!({
                "leave": {"id": "3", "topic": "grp1", "unsub": true},
                "extra": {"obo": "usrAlice"}
            })
        );
    }

    #[test]
    fn publish_embeds_content_as_json() {
        let message = ClientMessage::new(Request::Publish(Publish {
            id: "9".into(),
            topic: Some("grp1".into()),
            no_echo: true,
            content: Some(Blob::encode("hello").unwrap()),
        }));

        assert_eq!(
            wire(&message),
            json!({"pub": {"id": "9", "topic": "grp1", "noecho": true, "content": "hello"}})
        );
    }

    #[test]
    fn get_flattens_query() {
        let message = ClientMessage::new(Request::Get(Get {
            id: "4".into(),
            topic: Some("me".into()),
            query: GetQuery { what: "desc sub".into() },
        }));

        assert_eq!(wire(&message), json!({"get": {"id": "4", "topic": "me", "what": "desc sub"}}));
    }

    #[test]
    fn delete_names_field_what() {
        let message = ClientMessage::new(Request::Delete(Delete {
            id: "5".into(),
            topic: Some("grp1".into()),
            what: DeleteWhat::Messages,
            ranges: vec![SeqRange::single(3), SeqRange::all()],
            user: None,
            hard: false,
        }));

        assert_eq!(
            wire(&message),
            json!({"del": {
                "id": "5",
                "topic": "grp1",
                "what": "msg",
                "delseq": [{"low": 3}, {"low": 1, "hi": 0x08FF_FFFF}]
            }})
        );
    }

    #[test]
    fn note_omits_local_id() {
        let message = ClientMessage::new(Request::Note(Note {
            id: "12".into(),
            topic: Some("grp1".into()),
            what: NoteWhat::Read,
            seq: Some(42),
        }));

        assert_eq!(message.request.id(), "12");
        assert_eq!(wire(&message), json!({"note": {"topic": "grp1", "what": "read", "seq": 42}}));
    }

    #[test]
    fn subscribe_without_topic_has_no_target() {
        let message = ClientMessage::new(Request::Subscribe(Subscribe {
            id: "1".into(),
            topic: None,
            set_query: None,
            get_query: None,
        }));

        assert_eq!(message.request.topic(), None);
        assert_eq!(wire(&message), json!({"sub": {"id": "1"}}));
    }

    #[test]
    fn set_query_emptiness() {
        assert!(SetQuery::default().is_empty());
        let query = SetQuery { tags: vec!["x".into()], ..SetQuery::default() };
        assert!(!query.is_empty());
        assert!(SetDesc::default().is_empty());
    }
}
