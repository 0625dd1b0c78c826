//! Text formatting attributes
//!
//! Attributes are sparse: an unset key means "no opinion", so merging two
//! attribute sets is a shallow, per-key last-writer-wins overlay.

use serde::{Deserialize, Serialize};

/// List kind for a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Numbered list
    Ordered,
    /// Bulleted list
    Bullet,
    /// Checklist item, ticked
    Checked,
    /// Checklist item, unticked
    Unchecked,
}

/// Paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left aligned
    Left,
    /// Centered
    Center,
    /// Right aligned
    Right,
    /// Justified
    Justify,
}

/// Formatting applied to a run of text
///
/// # Example
///
/// ```rust
/// use armature_ot::TextAttributes;
///
/// let bold = TextAttributes::new().bold(true);
/// let red = TextAttributes::new().color("#ff0000");
///
/// let merged = bold.merge(&red);
/// assert_eq!(merged.bold, Some(true));
/// assert_eq!(merged.color.as_deref(), Some("#ff0000"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    /// Font size in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Header level (1-6)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<u8>,
}

impl TextAttributes {
    /// Create an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bold(mut self, value: bool) -> Self {
        self.bold = Some(value);
        self
    }

    pub fn italic(mut self, value: bool) -> Self {
        self.italic = Some(value);
        self
    }

    pub fn underline(mut self, value: bool) -> Self {
        self.underline = Some(value);
        self
    }

    pub fn color(mut self, value: impl Into<String>) -> Self {
        self.color = Some(value.into());
        self
    }

    pub fn font_size(mut self, value: u32) -> Self {
        self.font_size = Some(value);
        self
    }

    pub fn link(mut self, value: impl Into<String>) -> Self {
        self.link = Some(value.into());
        self
    }

    pub fn header(mut self, level: u8) -> Self {
        self.header = Some(level);
        self
    }

    /// True when no key is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `other` on top of `self`; keys set in `other` win.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.merge_from(other);
        merged
    }

    /// In-place version of [`merge`](Self::merge).
    pub fn merge_from(&mut self, other: &Self) {
        overlay(&mut self.bold, &other.bold);
        overlay(&mut self.italic, &other.italic);
        overlay(&mut self.underline, &other.underline);
        overlay(&mut self.strikethrough, &other.strikethrough);
        overlay(&mut self.font_size, &other.font_size);
        overlay(&mut self.font_family, &other.font_family);
        overlay(&mut self.color, &other.color);
        overlay(&mut self.background_color, &other.background_color);
        overlay(&mut self.link, &other.link);
        overlay(&mut self.header, &other.header);
        overlay(&mut self.list, &other.list);
        overlay(&mut self.align, &other.align);
        overlay(&mut self.indent, &other.indent);
    }
}

fn overlay<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if let Some(value) = source {
        *target = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_shallow_last_writer_wins() {
        let base = TextAttributes::new().bold(true).color("red");
        let update = TextAttributes::new().color("blue").italic(true);

        let merged = base.merge(&update);
        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.italic, Some(true));
        assert_eq!(merged.color.as_deref(), Some("blue"));
    }

    #[test]
    fn test_merge_keeps_explicit_false() {
        let base = TextAttributes::new().bold(true);
        let merged = base.merge(&TextAttributes::new().bold(false));
        assert_eq!(merged.bold, Some(false));
    }

    #[test]
    fn test_is_empty() {
        assert!(TextAttributes::new().is_empty());
        assert!(!TextAttributes::new().header(2).is_empty());
    }

    #[test]
    fn test_wire_format_is_sparse_camel_case() {
        let attrs = TextAttributes {
            background_color: Some("#fff".to_string()),
            list: Some(ListKind::Bullet),
            ..Default::default()
        };
        let json = serde_json::to_string(&attrs).unwrap();
        assert_eq!(json, r##"{"backgroundColor":"#fff","list":"bullet"}"##);

        let parsed: TextAttributes = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, attrs);
    }
}
