//! In-memory block tree backing the mock Blocks API.
//!
//! Nodes are stored flat by id with parent/child links; handlers ask for
//! owned `Block` trees when they need to answer.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const ROOT_ID: &str = "0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default = "text_type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Block>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

fn text_type() -> String {
    "text".to_string()
}

impl Block {
    pub fn text(markdown: &str) -> Self {
        Self {
            id: String::new(),
            block_type: text_type(),
            text_style: None,
            markdown: Some(markdown.to_string()),
            content: Vec::new(),
            attributes: Map::new(),
        }
    }

    fn is_page(&self) -> bool {
        self.block_type == "page"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocError {
    NotFound(String),
    Invalid(String),
    Conflict(String),
}

/// `position` object as sent by clients.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionBody {
    pub position: String,
    pub page_id: Option<String>,
    pub sibling_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Start(String),
    End(String),
    Before(String),
    After(String),
}

impl PositionBody {
    pub fn placement(self) -> Result<Placement, DocError> {
        match (self.position.as_str(), self.page_id, self.sibling_id) {
            ("start", Some(page), None) => Ok(Placement::Start(page)),
            ("end", Some(page), None) => Ok(Placement::End(page)),
            ("before", None, Some(sibling)) => Ok(Placement::Before(sibling)),
            ("after", None, Some(sibling)) => Ok(Placement::After(sibling)),
            (other, _, _) => Err(DocError::Invalid(format!(
                "position {other:?} needs exactly one of pageId (start/end) or siblingId (before/after)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub block_id: String,
    pub markdown: String,
    pub page_block_path: Vec<PathElement>,
    pub before_blocks: Vec<ContextBlock>,
    pub after_blocks: Vec<ContextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathElement {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBlock {
    pub block_id: String,
    pub markdown: String,
}

#[derive(Debug)]
struct Node {
    block: Block,
    parent: Option<String>,
    children: Vec<String>,
}

#[derive(Debug)]
pub struct Document {
    nodes: HashMap<String, Node>,
}

impl Document {
    /// A document holding only its root page.
    pub fn new(title: &str) -> Self {
        let root = Block {
            id: ROOT_ID.to_string(),
            block_type: "page".to_string(),
            text_style: Some("page".to_string()),
            markdown: Some(title.to_string()),
            content: Vec::new(),
            attributes: Map::new(),
        };
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_ID.to_string(),
            Node {
                block: root,
                parent: None,
                children: Vec::new(),
            },
        );
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Subtree rooted at `id`; `max_depth` of `None` means unbounded.
    pub fn tree(&self, id: &str, max_depth: Option<usize>) -> Option<Block> {
        let node = self.nodes.get(id)?;
        let mut block = node.block.clone();
        if max_depth != Some(0) {
            let next = max_depth.map(|d| d - 1);
            block.content = node
                .children
                .iter()
                .filter_map(|child| self.tree(child, next))
                .collect();
        }
        Some(block)
    }

    pub fn render_markdown(&self, id: &str, max_depth: Option<usize>) -> Option<String> {
        let tree = self.tree(id, max_depth)?;
        let mut parts = Vec::new();
        collect_markdown(&tree, &mut parts);
        Some(parts.join("\n\n"))
    }

    /// Attach `blocks` at `placement`, assigning fresh ids throughout.
    pub fn insert(
        &mut self,
        blocks: Vec<Block>,
        placement: &Placement,
    ) -> Result<Vec<Block>, DocError> {
        let (parent, mut index) = self.resolve(placement)?;
        let mut ids = Vec::with_capacity(blocks.len());
        for block in blocks {
            ids.push(self.attach(block, &parent, index));
            index += 1;
        }
        Ok(ids.iter().filter_map(|id| self.tree(id, None)).collect())
    }

    /// Apply each patch to the block with the same id. Fails before touching
    /// anything if one of the ids is unknown.
    pub fn update(&mut self, patches: Vec<Block>) -> Result<Vec<Block>, DocError> {
        if let Some(missing) = patches.iter().find(|p| !self.nodes.contains_key(&p.id)) {
            return Err(DocError::NotFound(missing.id.clone()));
        }
        let mut updated = Vec::with_capacity(patches.len());
        for patch in patches {
            let Some(node) = self.nodes.get_mut(&patch.id) else {
                continue;
            };
            let block = &mut node.block;
            block.block_type = patch.block_type;
            if patch.text_style.is_some() {
                block.text_style = patch.text_style;
            }
            if patch.markdown.is_some() {
                block.markdown = patch.markdown;
            }
            block.attributes.extend(patch.attributes);
            updated.push(block.clone());
        }
        Ok(updated)
    }

    /// Remove the listed subtrees; returns the ids actually removed.
    pub fn delete(&mut self, ids: &[String]) -> Vec<String> {
        let mut deleted = Vec::new();
        for id in ids {
            if id == ROOT_ID || !self.nodes.contains_key(id) {
                continue;
            }
            self.detach(id);
            self.remove_subtree(id);
            deleted.push(id.clone());
        }
        deleted
    }

    /// Move the listed blocks, in request order, to `placement`. Unknown ids,
    /// the root, and blocks that would end up inside themselves are skipped.
    pub fn move_blocks(
        &mut self,
        ids: &[String],
        placement: &Placement,
    ) -> Result<Vec<String>, DocError> {
        let (parent, mut index) = self.resolve(placement)?;
        let mut moved = Vec::new();
        for id in ids {
            if id == ROOT_ID || !self.nodes.contains_key(id) || self.is_ancestor_or_self(id, &parent)
            {
                continue;
            }
            if let Some((old_parent, old_index)) = self.detach(id) {
                if old_parent == parent && old_index < index {
                    index -= 1;
                }
            }
            if let Some(node) = self.nodes.get_mut(&parent) {
                let at = index.min(node.children.len());
                node.children.insert(at, id.clone());
                index = at + 1;
            }
            if let Some(node) = self.nodes.get_mut(id) {
                node.parent = Some(parent.clone());
            }
            moved.push(id.clone());
        }
        Ok(moved)
    }

    /// Blocks whose markdown matches `pattern`, in document order, with up
    /// to `before`/`after` neighbours taken from the flattened document.
    pub fn search(&self, pattern: &Regex, before: usize, after: usize) -> Vec<SearchHit> {
        let order = self.document_order();
        order
            .iter()
            .enumerate()
            .filter_map(|(i, id)| {
                let markdown = self.nodes.get(*id)?.block.markdown.as_deref()?;
                if !pattern.is_match(markdown) {
                    return None;
                }
                let after_end = (i + 1 + after).min(order.len());
                Some(SearchHit {
                    block_id: id.to_string(),
                    markdown: markdown.to_string(),
                    page_block_path: self.page_path(id),
                    before_blocks: order[i.saturating_sub(before)..i]
                        .iter()
                        .map(|c| self.context(c))
                        .collect(),
                    after_blocks: order[i + 1..after_end]
                        .iter()
                        .map(|c| self.context(c))
                        .collect(),
                })
            })
            .collect()
    }

    fn resolve(&self, placement: &Placement) -> Result<(String, usize), DocError> {
        match placement {
            Placement::Start(page) | Placement::End(page) => {
                let node = self
                    .nodes
                    .get(page)
                    .ok_or_else(|| DocError::NotFound(page.clone()))?;
                if !node.block.is_page() {
                    return Err(DocError::Invalid(format!("block {page} is not a page")));
                }
                let index = match placement {
                    Placement::Start(_) => 0,
                    _ => node.children.len(),
                };
                Ok((page.clone(), index))
            }
            Placement::Before(sibling) | Placement::After(sibling) => {
                let node = self
                    .nodes
                    .get(sibling)
                    .ok_or_else(|| DocError::NotFound(sibling.clone()))?;
                let parent = node
                    .parent
                    .clone()
                    .ok_or_else(|| DocError::Invalid("the root page has no siblings".to_string()))?;
                let index = self
                    .nodes
                    .get(&parent)
                    .and_then(|p| p.children.iter().position(|c| c == sibling))
                    .unwrap_or(0);
                let index = match placement {
                    Placement::After(_) => index + 1,
                    _ => index,
                };
                Ok((parent, index))
            }
        }
    }

    fn attach(&mut self, mut block: Block, parent: &str, index: usize) -> String {
        let id = Uuid::new_v4().to_string();
        let children = std::mem::take(&mut block.content);
        block.id = id.clone();
        self.nodes.insert(
            id.clone(),
            Node {
                block,
                parent: Some(parent.to_string()),
                children: Vec::new(),
            },
        );
        if let Some(node) = self.nodes.get_mut(parent) {
            let at = index.min(node.children.len());
            node.children.insert(at, id.clone());
        }
        for (i, child) in children.into_iter().enumerate() {
            self.attach(child, &id, i);
        }
        id
    }

    fn detach(&mut self, id: &str) -> Option<(String, usize)> {
        let parent = self.nodes.get(id)?.parent.clone()?;
        let siblings = &mut self.nodes.get_mut(&parent)?.children;
        let index = siblings.iter().position(|c| c == id)?;
        siblings.remove(index);
        Some((parent, index))
    }

    fn remove_subtree(&mut self, id: &str) {
        if let Some(node) = self.nodes.remove(id) {
            for child in node.children {
                self.remove_subtree(&child);
            }
        }
    }

    fn is_ancestor_or_self(&self, id: &str, of: &str) -> bool {
        let mut current = Some(of);
        while let Some(candidate) = current {
            if candidate == id {
                return true;
            }
            current = self.nodes.get(candidate).and_then(|n| n.parent.as_deref());
        }
        false
    }

    /// Every block except the root, pre-order.
    fn document_order(&self) -> Vec<&str> {
        let mut order = Vec::new();
        let mut stack: Vec<&str> = self
            .nodes
            .get(ROOT_ID)
            .map(|root| root.children.iter().rev().map(String::as_str).collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.children.iter().rev().map(String::as_str));
            }
        }
        order
    }

    /// Ancestor pages of `id`, root first.
    fn page_path(&self, id: &str) -> Vec<PathElement> {
        let mut path = Vec::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent.as_deref());
        while let Some(ancestor) = current {
            let Some(node) = self.nodes.get(ancestor) else {
                break;
            };
            if node.block.is_page() {
                path.push(PathElement {
                    id: ancestor.to_string(),
                    content: node.block.markdown.clone().unwrap_or_default(),
                });
            }
            current = node.parent.as_deref();
        }
        path.reverse();
        path
    }

    fn context(&self, id: &str) -> ContextBlock {
        ContextBlock {
            block_id: id.to_string(),
            markdown: self
                .nodes
                .get(id)
                .and_then(|n| n.block.markdown.clone())
                .unwrap_or_default(),
        }
    }
}

fn collect_markdown(block: &Block, parts: &mut Vec<String>) {
    if let Some(markdown) = block.markdown.as_deref().filter(|m| !m.is_empty()) {
        parts.push(markdown.to_string());
    }
    for child in &block.content {
        collect_markdown(child, parts);
    }
}

/// One text block per blank-line separated paragraph.
pub fn blocks_from_markdown(markdown: &str) -> Vec<Block> {
    markdown
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(Block::text)
        .collect()
}
