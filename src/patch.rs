//! The patch engine: partial edits over a document's block sequence.
//!
//! [`apply_patch`] is a pure transform `(current blocks, edits, inserts) ->
//! new blocks`. Edits run first, in request order, each seeing the effects
//! of earlier ones; inserts run strictly afterwards, also in order. A batch
//! is all-or-nothing: the engine works on an owned copy of the block list
//! and returns it only when every operation succeeded, so a failing batch
//! can never leak a half-applied state to the caller.
//!
//! An edit that targets a block deleted earlier in the same batch fails
//! with [`PatchError::BlockNotFound`] rather than guessing at intent. An
//! insert may anchor on any block present after the edit phase, including
//! earlier inserts' positions being shifted, but not on another insert's
//! freshly-minted ID (those IDs do not exist until the batch is applied).

use serde::Deserialize;
use thiserror::Error;

use crate::block_id;
use crate::models::{Block, BlockType, Meta};

/// What an edit does to its target block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditAction {
    Replace,
    Delete,
}

/// One edit against an existing block, identified by ID.
///
/// For `replace`, only the supplied fields change; omitted fields keep
/// their current values. For `delete`, the payload fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockEdit {
    pub block_id: String,
    pub action: EditAction,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(rename = "type", default)]
    pub block_type: Option<BlockType>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

/// One new block to insert. With no `after` anchor the block goes to the
/// head of the list; otherwise immediately after the anchor block. The
/// engine always mints a fresh ID for inserted blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockInsert {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub meta: Meta,
}

/// Why a patch batch was rejected. The offending block ID is always named.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("block not found: {0}")]
    BlockNotFound(String),
    #[error("insert anchor not found: {0}")]
    AnchorNotFound(String),
}

/// Applies a batch of edits and inserts to `current`, returning the new
/// block list. `current` is untouched; on error the partial working copy
/// is discarded.
pub fn apply_patch(
    current: &[Block],
    edits: &[BlockEdit],
    inserts: &[BlockInsert],
) -> Result<Vec<Block>, PatchError> {
    let mut working: Vec<Block> = current.to_vec();

    for edit in edits {
        let pos = working
            .iter()
            .position(|b| b.id == edit.block_id)
            .ok_or_else(|| PatchError::BlockNotFound(edit.block_id.clone()))?;

        match edit.action {
            EditAction::Delete => {
                working.remove(pos);
            }
            EditAction::Replace => {
                let block = &mut working[pos];
                if let Some(content) = &edit.content {
                    block.content = content.clone();
                }
                if let Some(block_type) = edit.block_type {
                    block.block_type = block_type;
                }
                if let Some(language) = &edit.language {
                    block.language = Some(language.clone());
                }
                if let Some(meta) = &edit.meta {
                    block.meta = meta.clone();
                }
            }
        }
    }

    for insert in inserts {
        let block = Block {
            id: block_id::mint(),
            block_type: insert.block_type,
            content: insert.content.clone(),
            language: insert.language.clone(),
            meta: insert.meta.clone(),
        };

        match &insert.after {
            None => working.insert(0, block),
            Some(anchor) => {
                let pos = working
                    .iter()
                    .position(|b| b.id == *anchor)
                    .ok_or_else(|| PatchError::AnchorNotFound(anchor.clone()))?;
                working.insert(pos + 1, block);
            }
        }
    }

    Ok(working)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, content: &str) -> Block {
        Block {
            id: id.to_string(),
            block_type: BlockType::Text,
            content: content.to_string(),
            language: None,
            meta: Meta::new(),
        }
    }

    fn replace_edit(id: &str, content: &str) -> BlockEdit {
        BlockEdit {
            block_id: id.to_string(),
            action: EditAction::Replace,
            content: Some(content.to_string()),
            block_type: None,
            language: None,
            meta: None,
        }
    }

    fn delete_edit(id: &str) -> BlockEdit {
        BlockEdit {
            block_id: id.to_string(),
            action: EditAction::Delete,
            content: None,
            block_type: None,
            language: None,
            meta: None,
        }
    }

    fn insert(after: Option<&str>, content: &str) -> BlockInsert {
        BlockInsert {
            after: after.map(|s| s.to_string()),
            block_type: BlockType::Text,
            content: content.to_string(),
            language: None,
            meta: Meta::new(),
        }
    }

    #[test]
    fn test_replace_updates_content() {
        let blocks = vec![block("a", "x")];
        let result = apply_patch(&blocks, &[replace_edit("a", "y")], &[]).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");
        assert_eq!(result[0].content, "y");
    }

    #[test]
    fn test_replace_leaves_omitted_fields_unchanged() {
        let mut code = block("a", "fn main() {}");
        code.block_type = BlockType::Code;
        code.language = Some("rust".to_string());

        let result = apply_patch(&[code], &[replace_edit("a", "fn main() { run() }")], &[]).unwrap();
        assert_eq!(result[0].block_type, BlockType::Code);
        assert_eq!(result[0].language.as_deref(), Some("rust"));
    }

    #[test]
    fn test_replace_can_retype_block() {
        let blocks = vec![block("a", "title")];
        let edit = BlockEdit {
            block_id: "a".to_string(),
            action: EditAction::Replace,
            content: None,
            block_type: Some(BlockType::Heading),
            language: None,
            meta: None,
        };
        let result = apply_patch(&blocks, &[edit], &[]).unwrap();
        assert_eq!(result[0].block_type, BlockType::Heading);
        assert_eq!(result[0].content, "title");
    }

    #[test]
    fn test_delete_removes_block() {
        let blocks = vec![block("a", "1"), block("b", "2")];
        let result = apply_patch(&blocks, &[delete_edit("a")], &[]).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "b");
    }

    #[test]
    fn test_edit_unknown_block_fails_whole_batch() {
        let blocks = vec![block("a", "1")];
        let err = apply_patch(&blocks, &[replace_edit("nope", "x")], &[]).unwrap_err();
        assert_eq!(err, PatchError::BlockNotFound("nope".to_string()));
    }

    #[test]
    fn test_later_edit_sees_earlier_delete() {
        // Deleting "a" then editing "a" is a contradiction; the batch fails.
        let blocks = vec![block("a", "1"), block("b", "2")];
        let err =
            apply_patch(&blocks, &[delete_edit("a"), replace_edit("a", "x")], &[]).unwrap_err();
        assert_eq!(err, PatchError::BlockNotFound("a".to_string()));
    }

    #[test]
    fn test_insert_without_anchor_goes_to_head() {
        let blocks = vec![block("a", "1")];
        let result = apply_patch(&blocks, &[], &[insert(None, "new")]).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].content, "new");
        assert_eq!(result[1].id, "a");
    }

    #[test]
    fn test_insert_after_anchor() {
        let blocks = vec![block("a", "1"), block("b", "2")];
        let result = apply_patch(&blocks, &[], &[insert(Some("a"), "mid")]).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].id, "a");
        assert_eq!(result[1].content, "mid");
        assert_eq!(result[2].id, "b");
    }

    #[test]
    fn test_insert_mints_fresh_id() {
        let blocks = vec![block("a", "1")];
        let result = apply_patch(&blocks, &[], &[insert(None, "new")]).unwrap();
        assert!(!result[0].id.is_empty());
        assert_ne!(result[0].id, "a");
    }

    #[test]
    fn test_insert_unknown_anchor_fails() {
        let blocks = vec![block("a", "1")];
        let err = apply_patch(&blocks, &[], &[insert(Some("ghost"), "x")]).unwrap_err();
        assert_eq!(err, PatchError::AnchorNotFound("ghost".to_string()));
    }

    #[test]
    fn test_insert_cannot_anchor_on_deleted_block() {
        let blocks = vec![block("a", "1"), block("b", "2")];
        let err =
            apply_patch(&blocks, &[delete_edit("a")], &[insert(Some("a"), "x")]).unwrap_err();
        assert_eq!(err, PatchError::AnchorNotFound("a".to_string()));
    }

    #[test]
    fn test_inserts_apply_in_order_after_edits() {
        // Two head inserts: the second lands above the first.
        let blocks = vec![block("a", "1")];
        let result =
            apply_patch(&blocks, &[], &[insert(None, "first"), insert(None, "second")]).unwrap();
        assert_eq!(result[0].content, "second");
        assert_eq!(result[1].content, "first");
        assert_eq!(result[2].id, "a");
    }

    #[test]
    fn test_chained_anchor_inserts_share_a_pre_existing_anchor() {
        // Both anchor on "a"; the later insert lands directly after "a",
        // pushing the earlier one down.
        let blocks = vec![block("a", "1"), block("b", "2")];
        let result = apply_patch(
            &blocks,
            &[],
            &[insert(Some("a"), "x"), insert(Some("a"), "y")],
        )
        .unwrap();
        let contents: Vec<&str> = result.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(contents, vec!["1", "y", "x", "2"]);
    }

    #[test]
    fn test_failed_batch_leaves_input_untouched() {
        let blocks = vec![block("a", "1")];
        let _ = apply_patch(&blocks, &[delete_edit("a"), delete_edit("a")], &[]).unwrap_err();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "1");
    }

    #[test]
    fn test_empty_batch_is_identity() {
        let blocks = vec![block("a", "1"), block("b", "2")];
        let result = apply_patch(&blocks, &[], &[]).unwrap();
        assert_eq!(result, blocks);
    }

    #[test]
    fn test_mixed_batch() {
        let blocks = vec![block("a", "1"), block("b", "2"), block("c", "3")];
        let result = apply_patch(
            &blocks,
            &[replace_edit("a", "1!"), delete_edit("b")],
            &[insert(Some("c"), "tail")],
        )
        .unwrap();
        let contents: Vec<&str> = result.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(contents, vec!["1!", "3", "tail"]);
    }
}
