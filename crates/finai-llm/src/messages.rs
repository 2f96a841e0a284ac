//! Message types for LLM communication
//!
//! A message carries either plain text or a list of content blocks. Blocks can
//! hold text or a base64-encoded document (for example a PDF report) that the
//! backend reads alongside the prompt.

use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// System message (handled separately in some providers)
    System,
}

/// Inline document payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    /// Media type (e.g., "application/pdf")
    pub media_type: String,
    /// Base64-encoded file content
    pub data: String,
    /// Original file name, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DocumentSource {
    /// Data URL form (`data:<mime>;base64,<data>`)
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Content block in a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content
    Text {
        /// Text content
        text: String,
    },

    /// Attached document
    Document {
        /// Document payload
        source: DocumentSource,
    },
}

/// Message content: either simple text or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Structured content blocks
    Blocks(Vec<ContentBlock>),
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Message content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

impl Message {
    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Create a user message with text followed by attached documents
    pub fn user_with_documents(text: impl Into<String>, documents: Vec<DocumentSource>) -> Self {
        if documents.is_empty() {
            return Self::user(text);
        }

        let mut blocks = vec![ContentBlock::Text { text: text.into() }];
        blocks.extend(
            documents
                .into_iter()
                .map(|source| ContentBlock::Document { source }),
        );

        Self {
            role: Role::User,
            content: Some(MessageContent::Blocks(blocks)),
        }
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Content blocks of the message, plain text becoming a single text block
    pub fn blocks(&self) -> Vec<ContentBlock> {
        match &self.content {
            Some(MessageContent::Text(text)) => vec![ContentBlock::Text { text: text.clone() }],
            Some(MessageContent::Blocks(blocks)) => blocks.clone(),
            None => Vec::new(),
        }
    }

    /// Extract the first text content from the message
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(MessageContent::Text(s)) => Some(s),
            Some(MessageContent::Blocks(blocks)) => blocks.iter().find_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Document { .. } => None,
            }),
            None => None,
        }
    }

    /// Number of attached documents
    pub fn document_count(&self) -> usize {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .filter(|b| matches!(b, ContentBlock::Document { .. }))
                .count(),
            _ => 0,
        }
    }

    /// All text blocks concatenated
    pub fn text_content(&self) -> String {
        match &self.content {
            Some(MessageContent::Text(s)) => s.clone(),
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Document { .. } => None,
                })
                .collect(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf() -> DocumentSource {
        DocumentSource {
            media_type: "application/pdf".to_string(),
            data: "JVBERi0=".to_string(),
            name: Some("pmi.pdf".to_string()),
        }
    }

    #[test]
    fn test_user_message() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), Some("Hello"));
        assert_eq!(msg.blocks().len(), 1);
    }

    #[test]
    fn test_user_with_documents() {
        let msg = Message::user_with_documents("Analyse", vec![pdf()]);
        let blocks = msg.blocks();

        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[1], ContentBlock::Document { source } if source.media_type == "application/pdf"));
        assert_eq!(msg.text(), Some("Analyse"));
    }

    #[test]
    fn test_user_without_documents_is_plain_text() {
        let msg = Message::user_with_documents("Analyse", Vec::new());
        assert!(matches!(msg.content, Some(MessageContent::Text(_))));
    }

    #[test]
    fn test_text_content_concatenates() {
        let msg = Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(vec![
                ContentBlock::Text { text: "a".into() },
                ContentBlock::Document { source: pdf() },
                ContentBlock::Text { text: "b".into() },
            ])),
        };
        assert_eq!(msg.text_content(), "ab");
    }

    #[test]
    fn test_data_url() {
        assert_eq!(pdf().data_url(), "data:application/pdf;base64,JVBERi0=");
    }

    #[test]
    fn test_serialization() {
        let msg = Message::user_with_documents("x", vec![pdf()]);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "document");
        assert_eq!(json["content"][1]["source"]["name"], "pmi.pdf");
    }
}
