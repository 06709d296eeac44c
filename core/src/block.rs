//! The block tree: the document content model shared by every operation.
//!
//! # Design
//! A `Block` owns its children outright (`Vec<Block>`), so a fetched subtree
//! is a plain value with no back-references. Enumerations the server may
//! extend (`BlockType`, `TextStyle`) keep unknown values verbatim in an
//! `Other` variant instead of failing to decode. `Width` is a real sum type
//! because the wire format is either a number or the string `"auto"`.

use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kind of content a block holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    #[default]
    Text,
    Page,
    Image,
    Video,
    File,
    Other(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Text => "text",
            BlockType::Page => "page",
            BlockType::Image => "image",
            BlockType::Video => "video",
            BlockType::File => "file",
            BlockType::Other(other) => other,
        }
    }
}

impl From<String> for BlockType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => BlockType::Text,
            "page" => BlockType::Page,
            "image" => BlockType::Image,
            "video" => BlockType::Video,
            "file" => BlockType::File,
            _ => BlockType::Other(value),
        }
    }
}

impl From<BlockType> for String {
    fn from(value: BlockType) -> Self {
        match value {
            BlockType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

/// Presentation role of a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TextStyle {
    Page,
    Card,
    H1,
    H2,
    H3,
    Body,
    Title,
    Subtitle,
    Caption,
    Other(String),
}

impl TextStyle {
    pub fn as_str(&self) -> &str {
        match self {
            TextStyle::Page => "page",
            TextStyle::Card => "card",
            TextStyle::H1 => "h1",
            TextStyle::H2 => "h2",
            TextStyle::H3 => "h3",
            TextStyle::Body => "body",
            TextStyle::Title => "title",
            TextStyle::Subtitle => "subtitle",
            TextStyle::Caption => "caption",
            TextStyle::Other(other) => other,
        }
    }
}

impl From<String> for TextStyle {
    fn from(value: String) -> Self {
        match value.as_str() {
            "page" => TextStyle::Page,
            "card" => TextStyle::Card,
            "h1" => TextStyle::H1,
            "h2" => TextStyle::H2,
            "h3" => TextStyle::H3,
            "body" => TextStyle::Body,
            "title" => TextStyle::Title,
            "subtitle" => TextStyle::Subtitle,
            "caption" => TextStyle::Caption,
            _ => TextStyle::Other(value),
        }
    }
}

impl From<TextStyle> for String {
    fn from(value: TextStyle) -> Self {
        match value {
            TextStyle::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

/// Display width of a media block: a pixel count or `"auto"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    Pixels(u32),
    Auto,
}

impl Serialize for Width {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Width::Pixels(px) => serializer.serialize_u32(*px),
            Width::Auto => serializer.serialize_str("auto"),
        }
    }
}

impl<'de> Deserialize<'de> for Width {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WidthVisitor)
    }
}

struct WidthVisitor;

impl<'de> Visitor<'de> for WidthVisitor {
    type Value = Width;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative pixel count or the string \"auto\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Width, E> {
        u32::try_from(v)
            .map(Width::Pixels)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Width, E> {
        u32::try_from(v)
            .map(Width::Pixels)
            .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Width, E> {
        // Some producers emit `600.0`; accept integral values only.
        if v.fract() == 0.0 && v >= 0.0 && v <= f64::from(u32::MAX) {
            Ok(Width::Pixels(v as u32))
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Width, E> {
        if v == "auto" {
            Ok(Width::Auto)
        } else {
            Err(E::invalid_value(Unexpected::Str(v), &self))
        }
    }
}

/// A node in the document tree.
///
/// `id` is empty until the server assigns one on insert. `mime_type` and
/// `file_size` are filled in by the server; request builders drop them
/// from outgoing blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_style: Option<TextStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::types::null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub content: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indentation_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Width>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl Block {
    /// A text block holding `markdown`.
    pub fn text(markdown: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Text,
            markdown: Some(markdown.into()),
            ..Self::default()
        }
    }

    /// A page block titled `title`. Children are added with `with_child`.
    pub fn page(title: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Page,
            markdown: Some(title.into()),
            ..Self::default()
        }
    }

    /// An image block pointing at `url`, e.g. the raw URL of an upload link.
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Image,
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_text_style(mut self, style: TextStyle) -> Self {
        self.text_style = Some(style);
        self
    }

    pub fn with_width(mut self, width: Width) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_indentation(mut self, level: u32) -> Self {
        self.indentation_level = Some(level);
        self
    }

    pub fn with_child(mut self, child: Block) -> Self {
        self.content.push(child);
        self
    }

    pub fn is_page(&self) -> bool {
        self.block_type == BlockType::Page
    }

    /// Number of blocks in this subtree, including `self`.
    pub fn count(&self) -> usize {
        self.walk().count()
    }

    /// Depth-first, pre-order traversal in document order.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// First block in this subtree whose id is `id`.
    pub fn find(&self, id: &str) -> Option<&Block> {
        self.walk().find(|b| b.id == id)
    }

    pub(crate) fn strip_file_metadata(&mut self) {
        self.mime_type = None;
        self.file_size = None;
        for child in &mut self.content {
            child.strip_file_metadata();
        }
    }
}

/// Iterator returned by `Block::walk`.
pub struct Walk<'a> {
    stack: Vec<&'a Block>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<&'a Block> {
        let block = self.stack.pop()?;
        self.stack.extend(block.content.iter().rev());
        Some(block)
    }
}
