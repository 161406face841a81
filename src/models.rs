//! Core data models for the document engine.
//!
//! A topic owns at most one [`Document`]: an ordered sequence of typed
//! [`Block`]s plus a monotonically increasing version counter. Every
//! mutation displaces the previous state into a [`Revision`], so the full
//! lineage of a document is always recoverable.

use serde::{Deserialize, Serialize};

use crate::block_id;

/// Open key-value map for presentation hints (link titles, layout flags).
/// Opaque to the engine.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// The closed set of block kinds a document may contain.
///
/// Serialized lowercase on the wire and in storage; unknown kinds are
/// rejected at the boundary rather than carried through as free strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Heading,
    Text,
    Code,
    Checklist,
    Link,
    Quote,
    Data,
}

/// One typed content unit in a document's block sequence.
///
/// Block IDs are unique within a single document version and are never
/// reused after deletion in the same lineage. `content` is opaque text;
/// its interpretation (checklist `[x]` lines, link targets) belongs to
/// presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub content: String,
    /// Only meaningful for `code` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

/// Caller-supplied block in a create-or-replace request. The `id` is
/// optional on input; the store mints one for any block that lacks it.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub meta: Meta,
}

impl BlockInput {
    /// Converts to a stored [`Block`], minting a fresh ID when the caller
    /// supplied none. Caller-supplied IDs are taken as-is; they are not
    /// checked against historical (now-displaced) IDs.
    pub fn into_block(self) -> Block {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => block_id::mint(),
        };
        Block {
            id,
            block_type: self.block_type,
            content: self.content,
            language: self.language,
            meta: self.meta,
        }
    }
}

/// Whether an editor is a human user or an AI agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorKind {
    Human,
    Agent,
}

impl EditorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorKind::Human => "human",
            EditorKind::Agent => "agent",
        }
    }

    pub fn parse(s: &str) -> Option<EditorKind> {
        match s {
            "human" => Some(EditorKind::Human),
            "agent" => Some(EditorKind::Agent),
            _ => None,
        }
    }
}

/// A resolved editor identity. Authentication happens upstream; the engine
/// only ever sees the final name + kind pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    pub name: String,
    pub kind: EditorKind,
}

/// The current state of one topic's document.
///
/// Timestamps are unix seconds; response DTOs format them as ISO8601.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub topic: String,
    pub blocks: Vec<Block>,
    pub version: i64,
    pub format: String,
    pub created_by: String,
    pub created_by_kind: EditorKind,
    pub last_edited_by: String,
    pub last_edited_by_kind: EditorKind,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An append-only snapshot of a document state that was displaced by a
/// later mutation. `version` is the version this state *was*, not the one
/// that replaced it.
#[derive(Debug, Clone)]
pub struct Revision {
    pub id: i64,
    pub document_id: String,
    pub topic: String,
    pub blocks: Vec<Block>,
    pub version: i64,
    pub edit_summary: Option<String>,
    pub edited_by: String,
    pub edited_by_kind: EditorKind,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_type_wire_names() {
        for (ty, name) in [
            (BlockType::Heading, "\"heading\""),
            (BlockType::Text, "\"text\""),
            (BlockType::Code, "\"code\""),
            (BlockType::Checklist, "\"checklist\""),
            (BlockType::Link, "\"link\""),
            (BlockType::Quote, "\"quote\""),
            (BlockType::Data, "\"data\""),
        ] {
            assert_eq!(serde_json::to_string(&ty).unwrap(), name);
        }
    }

    #[test]
    fn test_unknown_block_type_rejected() {
        let result: Result<BlockType, _> = serde_json::from_str("\"table\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_block_input_mints_missing_id() {
        let input: BlockInput =
            serde_json::from_str(r#"{"type": "text", "content": "hello"}"#).unwrap();
        let block = input.into_block();
        assert!(!block.id.is_empty());
        assert_eq!(block.content, "hello");
    }

    #[test]
    fn test_block_input_keeps_caller_id() {
        let input: BlockInput =
            serde_json::from_str(r#"{"id": "abc123", "type": "text", "content": "x"}"#).unwrap();
        assert_eq!(input.into_block().id, "abc123");
    }

    #[test]
    fn test_block_serializes_without_empty_optionals() {
        let block = Block {
            id: "b1".to_string(),
            block_type: BlockType::Text,
            content: "body".to_string(),
            language: None,
            meta: Meta::new(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(!json.contains("language"));
        assert!(!json.contains("meta"));
    }

    #[test]
    fn test_editor_kind_round_trip() {
        assert_eq!(EditorKind::parse("human"), Some(EditorKind::Human));
        assert_eq!(EditorKind::parse("agent"), Some(EditorKind::Agent));
        assert_eq!(EditorKind::parse("robot"), None);
        assert_eq!(EditorKind::Agent.as_str(), "agent");
    }
}
