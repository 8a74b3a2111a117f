// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! Windowing side of the context: owns nothing Vulkan, only hands out window
//! attributes and the window's current pixel size.

pub use winit;

use ember_core::RenderSize;
use serde::Deserialize;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowAttributes};

/// The `[window]` table of the config file; missing keys take defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "ember".to_owned(),
            width: 1280,
            height: 720,
        }
    }
}

pub fn window_attributes(cfg: &WindowConfig) -> WindowAttributes {
    Window::default_attributes()
        .with_title(cfg.title.clone())
        .with_inner_size(PhysicalSize::new(cfg.width.max(1), cfg.height.max(1)))
}

/// Inner size in physical pixels.
pub fn pixel_size(window: &Window) -> RenderSize {
    let size = window.inner_size();
    RenderSize::new(size.width, size.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_carry_title_and_size() {
        let attrs = window_attributes(&WindowConfig {
            title: "t".to_owned(),
            width: 0,
            height: 300,
        });
        assert_eq!(attrs.title, "t");
        assert_eq!(
            attrs.inner_size,
            Some(PhysicalSize::new(1u32, 300u32).into())
        );
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let cfg: WindowConfig = toml::from_str("width = 640").unwrap();
        assert_eq!(cfg.width, 640);
        assert_eq!(cfg.title, WindowConfig::default().title);
        assert_eq!(cfg.height, WindowConfig::default().height);
    }
}
