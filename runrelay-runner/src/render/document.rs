// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{Value, json};
use std::fmt;

/// A structured report, independent of how the tracker displays it.
///
/// Documents convert to Atlassian Document Format with [`Document::to_adf`] and to Markdown
/// through `Display`. Both conversions are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

/// A top-level element of a [`Document`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// A heading. Levels run from 1 to 6.
    Heading {
        /// The heading level.
        level: u8,

        /// The heading text.
        text: String,
    },

    /// A paragraph of inline content.
    Paragraph(Vec<Inline>),

    /// A bulleted list, one entry per item.
    BulletList(Vec<Vec<Inline>>),
}

/// Inline content within a paragraph or list item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    /// Plain text.
    Text(String),

    /// Bold text.
    Strong(String),

    /// A hyperlink.
    Link {
        /// The link text.
        text: String,

        /// The link target.
        href: String,
    },
}

impl Inline {
    /// Creates plain text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates bold text.
    pub fn strong(text: impl Into<String>) -> Self {
        Self::Strong(text.into())
    }

    /// Creates a hyperlink.
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self::Link {
            text: text.into(),
            href: href.into(),
        }
    }

    fn plain_text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Strong(text) | Self::Link { text, .. } => text,
        }
    }

    fn to_adf(&self) -> Value {
        match self {
            Self::Text(text) => json!({ "type": "text", "text": text }),
            Self::Strong(text) => json!({
                "type": "text",
                "text": text,
                "marks": [{ "type": "strong" }],
            }),
            Self::Link { text, href } => json!({
                "type": "text",
                "text": text,
                "marks": [{ "type": "link", "attrs": { "href": href } }],
            }),
        }
    }
}

impl fmt::Display for Inline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Strong(text) => write!(f, "**{text}**"),
            Self::Link { text, href } => write!(f, "[{text}]({href})"),
        }
    }
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the blocks in this document.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a heading.
    pub fn heading(&mut self, level: u8, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Heading {
            level: level.clamp(1, 6),
            text: text.into(),
        });
        self
    }

    /// Appends a paragraph.
    pub fn paragraph(&mut self, content: impl IntoIterator<Item = Inline>) -> &mut Self {
        self.blocks
            .push(Block::Paragraph(content.into_iter().collect()));
        self
    }

    /// Appends a bulleted list. Empty lists are dropped.
    pub fn bullet_list(&mut self, items: impl IntoIterator<Item = Vec<Inline>>) -> &mut Self {
        let items: Vec<_> = items.into_iter().collect();
        if !items.is_empty() {
            self.blocks.push(Block::BulletList(items));
        }
        self
    }

    /// Returns the document's text without formatting, one line per heading, paragraph or list
    /// item.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading { text, .. } => lines.push(text.clone()),
                Block::Paragraph(content) => lines.push(inline_plain_text(content)),
                Block::BulletList(items) => {
                    lines.extend(items.iter().map(|item| inline_plain_text(item)));
                }
            }
        }
        lines.join("\n")
    }

    /// Returns true if the document's plain text contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.plain_text().contains(needle)
    }

    /// Converts this document to Atlassian Document Format.
    pub fn to_adf(&self) -> Value {
        let content: Vec<Value> = self
            .blocks
            .iter()
            .map(|block| match block {
                Block::Heading { level, text } => json!({
                    "type": "heading",
                    "attrs": { "level": level },
                    "content": inline_adf(&[Inline::text(text.as_str())]),
                }),
                Block::Paragraph(content) => adf_paragraph(content),
                Block::BulletList(items) => json!({
                    "type": "bulletList",
                    "content": items
                        .iter()
                        .map(|item| json!({
                            "type": "listItem",
                            "content": [adf_paragraph(item)],
                        }))
                        .collect::<Vec<_>>(),
                }),
            })
            .collect();

        json!({
            "type": "doc",
            "version": 1,
            "content": content,
        })
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, block) in self.blocks.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            match block {
                Block::Heading { level, text } => {
                    writeln!(f, "{} {text}", "#".repeat(usize::from(*level)))?;
                }
                Block::Paragraph(content) => {
                    write_inlines(f, content)?;
                    writeln!(f)?;
                }
                Block::BulletList(items) => {
                    for item in items {
                        f.write_str("- ")?;
                        write_inlines(f, item)?;
                        writeln!(f)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn write_inlines(f: &mut fmt::Formatter<'_>, content: &[Inline]) -> fmt::Result {
    content.iter().try_for_each(|inline| write!(f, "{inline}"))
}

fn inline_plain_text(content: &[Inline]) -> String {
    content.iter().map(Inline::plain_text).collect()
}

// ADF rejects text nodes with empty text.
fn inline_adf(content: &[Inline]) -> Vec<Value> {
    content
        .iter()
        .filter(|inline| !inline.plain_text().is_empty())
        .map(Inline::to_adf)
        .collect()
}

fn adf_paragraph(content: &[Inline]) -> Value {
    json!({
        "type": "paragraph",
        "content": inline_adf(content),
    })
}
