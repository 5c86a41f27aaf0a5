//! Marketplace platform table.

use serde::Serialize;

/// Key of the platform used when none, or an unknown one, is requested.
pub const DEFAULT_PLATFORM: &str = "taobao";

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG. Alpha is flattened away.
    Jpeg,
    /// PNG with alpha.
    Png,
}

impl OutputFormat {
    /// File extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Export constraints of one marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Platform {
    /// Lookup key and output subdirectory name.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Images wider than this are downscaled.
    pub max_width: u32,
    /// Advisory maximum height; not enforced.
    pub max_height: u32,
    /// Output format.
    pub format: OutputFormat,
    /// Default JPEG quality, 1 to 100.
    pub quality: u8,
}

/// Every known platform, in display order.
pub static PLATFORMS: &[Platform] = &[
    Platform {
        key: "taobao",
        name: "淘宝/天猫",
        max_width: 790,
        max_height: 10000,
        format: OutputFormat::Jpeg,
        quality: 95,
    },
    Platform {
        key: "jd",
        name: "京东",
        max_width: 750,
        max_height: 9999,
        format: OutputFormat::Jpeg,
        quality: 95,
    },
    Platform {
        key: "pdd",
        name: "拼多多",
        max_width: 750,
        max_height: 10000,
        format: OutputFormat::Jpeg,
        quality: 90,
    },
];

/// Look up a platform by key.
#[must_use]
pub fn find(key: &str) -> Option<&'static Platform> {
    PLATFORMS.iter().find(|platform| platform.key == key)
}

/// Look up a platform, falling back to the default platform's constraints.
#[must_use]
pub fn resolve(key: &str) -> &'static Platform {
    find(key).unwrap_or_else(|| {
        tracing::warn!("Unknown platform {key:?}, using {DEFAULT_PLATFORM} constraints");
        &PLATFORMS[0]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_platform_is_first() {
        assert_eq!(PLATFORMS[0].key, DEFAULT_PLATFORM);
    }

    #[test]
    fn test_find() {
        let jd = find("jd").expect("jd");
        assert_eq!(jd.name, "京东");
        assert_eq!(jd.max_width, 750);
        assert!(find("amazon").is_none());
    }

    #[test]
    fn test_unknown_platform_resolves_to_default() {
        assert_eq!(resolve("amazon").key, "taobao");
        assert_eq!(resolve("pdd").quality, 90);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Png.extension(), "png");
    }
}
