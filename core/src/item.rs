use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content captured by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    PlainText,
    RichText,
    Image,
    File,
    Link,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::PlainText => "plain_text",
            ContentType::RichText => "rich_text",
            ContentType::Image => "image",
            ContentType::File => "file",
            ContentType::Link => "link",
        }
    }
}

/// One captured clipboard entry, exactly as the backend reports it.
///
/// The client never writes these back; transient UI flags live elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardItem {
    pub id: String,
    pub content_type: ContentType,
    /// Always populated, even for images and files.
    pub plain_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub source_app: String,
    #[serde(default)]
    pub source_app_name: String,
    pub content_size: u64,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default)]
    pub is_favorited: bool,
    /// UTC wall-clock, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
    pub updated_at: String,
}

/// Content-type filter applied to listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    #[default]
    All,
    PlainText,
    RichText,
    Image,
    File,
}

impl FilterType {
    /// The content type sent to the backend; `None` means unfiltered.
    pub fn content_type(&self) -> Option<ContentType> {
        match self {
            FilterType::All => None,
            FilterType::PlainText => Some(ContentType::PlainText),
            FilterType::RichText => Some(ContentType::RichText),
            FilterType::Image => Some(ContentType::Image),
            FilterType::File => Some(ContentType::File),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(FilterType::All),
            "plain_text" | "text" => Some(FilterType::PlainText),
            "rich_text" => Some(FilterType::RichText),
            "image" => Some(FilterType::Image),
            "file" => Some(FilterType::File),
            _ => None,
        }
    }
}

/// Top-level tab: full history or favorited items only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    History,
    Pins,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::History => f.write_str("history"),
            ViewMode::Pins => f.write_str("pins"),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_item(id: &str, updated_at: &str) -> ClipboardItem {
    ClipboardItem {
        id: id.to_string(),
        content_type: ContentType::PlainText,
        plain_text: format!("text {}", id),
        rich_content: None,
        thumbnail: None,
        image_path: None,
        file_path: None,
        file_name: None,
        source_app: "com.test".to_string(),
        source_app_name: "TestApp".to_string(),
        content_size: 11,
        content_hash: format!("hash-{}", id),
        is_favorited: false,
        created_at: updated_at.to_string(),
        updated_at: updated_at.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_payload() {
        let json = r#"{
            "id": "a1",
            "content_type": "rich_text",
            "plain_text": "Hello",
            "rich_content": "<b>Hello</b>",
            "source_app": "com.apple.Safari",
            "source_app_name": "Safari",
            "content_size": 5,
            "content_hash": "abc",
            "is_favorited": true,
            "created_at": "2026-02-23 10:00:00",
            "updated_at": "2026-02-23 10:00:00"
        }"#;

        let item: ClipboardItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.content_type, ContentType::RichText);
        assert_eq!(item.rich_content.as_deref(), Some("<b>Hello</b>"));
        assert!(item.is_favorited);
        assert!(item.thumbnail.is_none());
    }

    #[test]
    fn filter_all_sends_no_content_type() {
        assert_eq!(FilterType::All.content_type(), None);
        assert_eq!(FilterType::Image.content_type(), Some(ContentType::Image));
        assert_eq!(FilterType::parse("text"), Some(FilterType::PlainText));
        assert_eq!(FilterType::parse("link"), None);
    }
}
