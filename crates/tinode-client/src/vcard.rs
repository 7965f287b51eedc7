//! Public profile card built from `--fn` and `--photo`.

use std::{fs, path::Path};

use base64::Engine;
use serde::Serialize;

use crate::outbox::Outbox;

/// Name and avatar, serialized as the `public` value of a topic or account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vcard {
    /// Display name.
    #[serde(rename = "fn", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Avatar image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,
}

/// Inline image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Photo {
    /// Base64 image bytes.
    pub data: String,
    /// Image type, taken from the file extension.
    #[serde(rename = "type")]
    pub kind: String,
}

impl Vcard {
    /// Build a card from a name and an optional image file.
    ///
    /// Returns `None` when neither a non-blank name nor a photo path is
    /// given. An unreadable photo is reported to the operator and left out.
    pub fn build(full_name: Option<&str>, photo: Option<&Path>, outbox: &Outbox) -> Option<Self> {
        let full_name = full_name.map(str::trim).filter(|name| !name.is_empty());
        if full_name.is_none() && photo.is_none() {
            return None;
        }

        let photo = photo.and_then(|path| match fs::read(path) {
            Ok(bytes) => Some(Photo {
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
                kind: path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            }),
            Err(e) => {
                outbox.println(format!("Error opening '{}': {e}", path.display()));
                None
            },
        });

        Some(Self { full_name: full_name.map(str::to_string), photo })
    }
}
