//! Screens: the vertical bands a detail page is split into.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{
    BLANK_SCREEN_NAME, COPY_MARKER, DEFAULT_SCREEN_HEIGHT, MAX_SCREEN_HEIGHT,
    SCREEN_CAPTION_SEPARATOR, SCREEN_NAME_PREFIX, SCREEN_NAME_SUFFIX,
};

/// Unique identifier for a screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenId(String);

impl ScreenId {
    /// Create a new unique screen ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier string.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScreenId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScreenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named horizontal band of the canvas.
///
/// Blank screens are spacers: they take up height but are skipped on export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    /// Unique identifier.
    pub id: ScreenId,
    /// Display name, e.g. "第2屏 - 产品展示".
    pub name: String,
    height: u32,
    /// Whether this is a blank spacer.
    pub is_blank: bool,
}

impl Screen {
    /// Create a screen. The height is clamped to `1..=MAX_SCREEN_HEIGHT`.
    #[must_use]
    pub fn new(name: impl Into<String>, height: u32, is_blank: bool) -> Self {
        Self {
            id: ScreenId::new(),
            name: name.into(),
            height: height.clamp(1, MAX_SCREEN_HEIGHT),
            is_blank,
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Set the height without the interactive minimum. Used by document
    /// loading and by the canvas, which owns the minimum-height rule.
    pub(crate) fn set_height(&mut self, height: u32) {
        self.height = height.clamp(1, MAX_SCREEN_HEIGHT);
    }

    /// Whether the name still looks auto-generated and may be renumbered.
    ///
    /// Names that no longer start with the numbering prefix, or that carry
    /// the copy marker, are left alone.
    #[must_use]
    pub fn has_numbered_name(&self) -> bool {
        self.name.starts_with(SCREEN_NAME_PREFIX) && !self.name.contains(COPY_MARKER)
    }

    /// Replace the number in an auto-generated name, keeping any caption
    /// after the " - " separator.
    pub(crate) fn renumber(&mut self, number: usize) {
        let caption = self
            .name
            .split_once(SCREEN_CAPTION_SEPARATOR)
            .map(|(_, caption)| caption.to_string())
            .filter(|caption| !caption.is_empty());
        self.name = numbered_name(number, caption.as_deref());
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new("分屏", DEFAULT_SCREEN_HEIGHT, false)
    }
}

/// Build "第N屏", optionally followed by " - caption".
#[must_use]
pub fn numbered_name(number: usize, caption: Option<&str>) -> String {
    match caption {
        Some(caption) => format!(
            "{SCREEN_NAME_PREFIX}{number}{SCREEN_NAME_SUFFIX}{SCREEN_CAPTION_SEPARATOR}{caption}"
        ),
        None => format!("{SCREEN_NAME_PREFIX}{number}{SCREEN_NAME_SUFFIX}"),
    }
}

/// Default name for a newly inserted screen.
pub(crate) fn auto_name(non_blank_count: usize, is_blank: bool) -> String {
    if is_blank {
        BLANK_SCREEN_NAME.to_string()
    } else {
        numbered_name(non_blank_count + 1, None)
    }
}

/// The three screens every new document starts with.
#[must_use]
pub fn default_screens() -> Vec<Screen> {
    vec![
        Screen::new(numbered_name(1, Some("首屏")), 400, false),
        Screen::new(numbered_name(2, Some("产品展示")), 350, false),
        Screen::new(numbered_name(3, Some("卖点介绍")), 350, false),
    ]
}

/// Renumber auto-named, non-blank screens in order.
///
/// Screens whose names were customized or duplicated keep their names and do
/// not consume a number.
pub(crate) fn renumber(screens: &mut [Screen]) {
    let mut number = 1;
    for screen in screens.iter_mut().filter(|s| !s.is_blank) {
        if !screen.has_numbered_name() {
            continue;
        }
        screen.renumber(number);
        number += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_screens() {
        let screens = default_screens();
        let heights: Vec<u32> = screens.iter().map(Screen::height).collect();
        assert_eq!(heights, vec![400, 350, 350]);
        assert_eq!(screens[0].name, "第1屏 - 首屏");
    }

    #[test]
    fn test_renumber_keeps_caption() {
        let mut screen = Screen::new("第7屏 - 卖点", 100, false);
        screen.renumber(2);
        assert_eq!(screen.name, "第2屏 - 卖点");
    }

    #[test]
    fn test_renumber_skips_custom_and_copies() {
        let mut screens = vec![
            Screen::new("第5屏", 100, false),
            Screen::new("Banner", 100, false),
            Screen::new("第1屏 副本", 100, false),
            Screen::new(BLANK_SCREEN_NAME, 100, true),
            Screen::new("第9屏 - 结尾", 100, false),
        ];
        renumber(&mut screens);

        let names: Vec<&str> = screens.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["第1屏", "Banner", "第1屏 副本", "留白", "第2屏 - 结尾"]);
    }

    #[test]
    fn test_auto_name() {
        assert_eq!(auto_name(3, false), "第4屏");
        assert_eq!(auto_name(3, true), "留白");
    }

    #[test]
    fn test_height_is_positive() {
        assert_eq!(Screen::new("x", 0, false).height(), 1);
    }

    #[test]
    fn test_height_is_capped() {
        let mut screen = Screen::new("x", u32::MAX, false);
        assert_eq!(screen.height(), MAX_SCREEN_HEIGHT);
        screen.set_height(3_000_000_000);
        assert_eq!(screen.height(), MAX_SCREEN_HEIGHT);
    }
}
