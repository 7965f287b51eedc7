//! Terminal rendering of server messages.

use tinode_proto::{Ctrl, Data, Info, Meta};

/// `<code> <text>`
pub fn ctrl(ctrl: &Ctrl) -> String {
    format!("{} {}", ctrl.code, ctrl.text)
}

/// Sender line followed by the decoded content.
pub fn data(data: &Data) -> Vec<String> {
    let from = data.from.as_deref().unwrap_or_default();
    let content = data.content.as_ref().map(|c| c.to_display_string()).unwrap_or_default();

    let mut lines = vec![format!("From: {from}:")];
    lines.extend(content.lines().map(str::to_string));
    lines
}

/// `Message #<seq> <what> by <user>; topic=<topic>`
pub fn info(info: &Info) -> String {
    let seq = info.seq.map(|s| s.to_string()).unwrap_or_default();
    format!("Message #{seq} {} by {}; topic={}", info.what, info.from, info.topic)
}

/// One line naming the sections a meta message carries.
pub fn meta(meta: &Meta) -> String {
    let mut sections = Vec::new();
    if meta.desc.is_some() {
        sections.push("desc".to_string());
    }
    if !meta.sub.is_empty() {
        sections.push(format!("sub({})", meta.sub.len()));
    }
    if !meta.tags.is_empty() {
        sections.push(format!("tags[{}]", meta.tags.join(",")));
    }
    if meta.del.is_some() {
        sections.push("del".to_string());
    }
    if !meta.cred.is_empty() {
        sections.push(format!("cred({})", meta.cred.len()));
    }

    if sections.is_empty() {
        format!("Meta for {}: empty", meta.topic)
    } else {
        format!("Meta for {}: {}", meta.topic, sections.join(" "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tinode_proto::Blob;

    use super::*;

    #[test]
    fn ctrl_line() {
        let ack = Ctrl { code: 201, text: "created".into(), ..Ctrl::default() };
        assert_eq!(ctrl(&ack), "201 created");
    }

    #[test]
    fn data_shows_sender_and_unquoted_text() {
        let message = Data {
            topic: "grp1".into(),
            from: Some("usr2".into()),
            seq: 3,
            content: Some(Blob::encode("hello").unwrap()),
        };
        assert_eq!(data(&message), vec!["From: usr2:", "hello"]);
    }

    #[test]
    fn data_structured_content_is_json() {
        let message = Data {
            topic: "grp1".into(),
            from: None,
            seq: 4,
            content: Some(Blob::encode(&serde_json::json!({"txt": "hi"})).unwrap()),
        };
        assert_eq!(data(&message), vec!["From: :", r#"{"txt":"hi"}"#]);
    }

    #[test]
    fn info_line() {
        let notice = Info { topic: "grp1".into(), from: "usr3".into(), what: "read".into(), seq: Some(9) };
        assert_eq!(info(&notice), "Message #9 read by usr3; topic=grp1");
    }

    #[test]
    fn meta_lists_present_sections() {
        let reply = Meta {
            topic: "me".into(),
            desc: Some(Blob::encode(&serde_json::json!({})).unwrap()),
            tags: vec!["a".into(), "b".into()],
            ..Meta::default()
        };
        assert_eq!(meta(&reply), "Meta for me: desc tags[a,b]");
        assert_eq!(meta(&Meta { topic: "fnd".into(), ..Meta::default() }), "Meta for fnd: empty");
    }
}
