//! Scene configuration.
//!
//! Every field has a default matching the stock scene, so an empty (or missing) TOML file
//! yields the standard layout. Only the values that make sense to tweak live here; the
//! scroll/frame motion constants are part of the controller.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::EngineResult;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub stars: StarsConfig,
    pub assets: AssetsConfig,
    pub scroll: ScrollConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "scroll-scene".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl WindowConfig {
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Initial position. The startup scroll pass overwrites X and Z right away.
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [-3.0, 0.0, 30.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarsConfig {
    pub count: usize,
    /// Width of the cube stars are scattered in, centered on the origin.
    pub spread: f32,
    pub radius: f32,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for StarsConfig {
    fn default() -> Self {
        Self {
            count: 200,
            spread: 100.0,
            radius: 0.25,
            seed: None,
        }
    }
}

/// Image paths, resolved against the working directory and then the crate root.
///
/// The images are not shipped; drop them into `assets/` (see `assets/README.md`) or point
/// these at your own. A missing image is logged once and the object keeps its base colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub background: String,
    pub avatar: String,
    pub moon: String,
    pub moon_normal: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            background: "assets/space.jpg".to_string(),
            avatar: "assets/jeff.png".to_string(),
            moon: "assets/moon.jpg".to_string(),
            moon_normal: "assets/normal.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Pixels scrolled per wheel "line" (and per arrow key press).
    pub line_height_px: f32,
    /// How far the virtual page can be scrolled down.
    pub max_scroll_px: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            line_height_px: 40.0,
            max_scroll_px: 4000.0,
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let c = SceneConfig::from_toml_str("").unwrap();
        assert_eq!(c, SceneConfig::default());
        assert_eq!(c.stars.count, 200);
        assert_eq!(c.camera.fov_y_degrees, 75.0);
        assert_eq!(c.assets.moon_normal, "assets/normal.jpg");
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let c = SceneConfig::from_toml_str(
            r#"
            [stars]
            count = 12
            seed = 7

            [scroll]
            max_scroll_px = 900.0
            "#,
        )
        .unwrap();

        assert_eq!(c.stars.count, 12);
        assert_eq!(c.stars.seed, Some(7));
        assert_eq!(c.stars.spread, 100.0);
        assert_eq!(c.scroll.max_scroll_px, 900.0);
        assert_eq!(c.scroll.line_height_px, 40.0);
        assert_eq!(c.window, WindowConfig::default());
    }

    #[test]
    fn default_images_live_under_assets() {
        let a = AssetsConfig::default();
        for (path, file) in [
            (&a.background, "space.jpg"),
            (&a.avatar, "jeff.png"),
            (&a.moon, "moon.jpg"),
            (&a.moon_normal, "normal.jpg"),
        ] {
            assert_eq!(Path::new(path), Path::new("assets").join(file).as_path());
        }
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = SceneConfig::from_toml_str("[stars\ncount = 1").unwrap_err();
        assert!(matches!(err, crate::engine::EngineError::Config(_)));
    }

    #[test]
    fn missing_path_uses_defaults() {
        assert_eq!(SceneConfig::load(None).unwrap(), SceneConfig::default());
    }

    #[test]
    fn aspect_guards_zero_height() {
        let w = WindowConfig {
            height: 0,
            ..WindowConfig::default()
        };
        assert_eq!(w.aspect(), 1.0);
        assert_eq!(WindowConfig::default().aspect(), 1280.0 / 720.0);
    }
}
