use serde::{Deserialize, Serialize};

/// Display and page metrics that size the capture window.
///
/// All pixel fields are device-physical pixels. Embedders can feed this
/// straight from platform JSON — camelCase field names are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device viewport width in physical pixels.
    #[serde(alias = "viewportWidthPx")]
    pub viewport_width_px: i32,

    /// Device viewport height in physical pixels.
    #[serde(alias = "viewportHeightPx")]
    pub viewport_height_px: i32,

    /// Minimum page-scale factor reported by the renderer for this page.
    /// Capture-space coordinates are viewport pixels multiplied by this.
    #[serde(alias = "minPageScale")]
    pub min_page_scale: f32,

    /// Capture into a memory-backed buffer rather than a temp file.
    #[serde(alias = "inMemory")]
    pub in_memory: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport_width_px: 1080,
            viewport_height_px: 2160,
            min_page_scale: 1.0,
            in_memory: true,
        }
    }
}

impl CaptureConfig {
    /// Viewport height in the capture's coordinate space: the on-screen
    /// viewport height scaled by the page's minimum page-scale factor.
    /// Computed once and used as the unit for capture-window sizing.
    pub fn scaled_viewport_height(&self) -> i32 {
        (self.viewport_height_px as f32 * self.min_page_scale).floor() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::CaptureConfig;

    #[test]
    fn deserializes_camel_case_fields() {
        let json = r#"{
            "viewportWidthPx": 1440,
            "viewportHeightPx": 3040,
            "minPageScale": 0.5,
            "inMemory": false
        }"#;

        let cfg: CaptureConfig = serde_json::from_str(json).expect("valid camelCase config");
        assert_eq!(cfg.viewport_width_px, 1440);
        assert_eq!(cfg.viewport_height_px, 3040);
        assert_eq!(cfg.min_page_scale, 0.5);
        assert!(!cfg.in_memory);
    }

    #[test]
    fn deserializes_snake_case_fields() {
        let json = r#"{
            "viewport_width_px": 1080,
            "viewport_height_px": 2160,
            "min_page_scale": 1.0,
            "in_memory": true
        }"#;

        let cfg: CaptureConfig = serde_json::from_str(json).expect("valid snake_case config");
        assert_eq!(cfg, CaptureConfig::default());
    }

    #[test]
    fn scaled_viewport_height_floors() {
        let cfg = CaptureConfig { viewport_height_px: 2001, min_page_scale: 0.5, ..Default::default() };
        assert_eq!(cfg.scaled_viewport_height(), 1000);
    }
}
