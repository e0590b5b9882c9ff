use log::Level;
use serde::Deserialize;

use crate::env::Environment;
use crate::error::{Result, ShellError};

pub const CONFIG_ELEMENT: &str = "#landing-config";

#[cfg(debug_assertions)]
pub fn log_level() -> Level {
    Level::Debug // verbose while developing locally
}

#[cfg(not(debug_assertions))]
pub fn log_level() -> Level {
    Level::Info
}

/// Selectors for every element the shell wires up. All of them are optional
/// at runtime: a missing element only disables its feature.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DomContract {
    pub loading_overlay: String,
    pub theme_toggle: String,
    pub theme_icon: String,
    pub theme_color_meta: String,
    pub menu_button: String,
    pub sidebar: String,
    pub sidebar_close: String,
    pub nav_links: String,
    pub header: String,
    pub scroll_indicator: String,
    pub reveal: String,
    pub particle_container: String,
    pub cursor_ring: String,
    pub cursor_dot: String,
    pub interactive: String,
    pub video_card: String,
    pub video_embed: String,
    pub video_overlay: String,
    pub ripple_targets: String,
    pub overlays: String,
    pub lazy_images: String,
}

impl Default for DomContract {
    fn default() -> Self {
        Self {
            loading_overlay: "#loading".to_string(),
            theme_toggle: "#themeToggle".to_string(),
            theme_icon: "i".to_string(),
            theme_color_meta: "meta[name='theme-color']".to_string(),
            menu_button: "#menuBtn".to_string(),
            sidebar: "#sidebar".to_string(),
            sidebar_close: "#sidebarClose".to_string(),
            nav_links: ".nav-link".to_string(),
            header: ".header".to_string(),
            scroll_indicator: ".scroll-indicator".to_string(),
            reveal: ".reveal".to_string(),
            particle_container: "#particles".to_string(),
            cursor_ring: ".cursor-ring".to_string(),
            cursor_dot: ".cursor-dot".to_string(),
            interactive: "a, button, .category-card, .teacher-card, .video-card".to_string(),
            video_card: ".video-card".to_string(),
            video_embed: "iframe".to_string(),
            video_overlay: ".video-overlay".to_string(),
            ripple_targets: ".category-card, .teacher-card".to_string(),
            overlays: ".modal".to_string(),
            lazy_images: "img[loading='lazy']".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    pub brand: String,
    pub storage_key: String,
    pub min_loading_ms: u32,
    pub loading_fade_ms: u32,
    pub mobile_breakpoint: f64,
    pub max_particles: usize,
    pub particle_spacing: f64,
    pub header_threshold: f64,
    pub header_gutter: f64,
    pub font_stylesheets: Vec<String>,
    pub dom: DomContract,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            brand: "Landing".to_string(),
            storage_key: "theme".to_string(),
            min_loading_ms: 1000,
            loading_fade_ms: 500,
            mobile_breakpoint: 768.0,
            max_particles: 50,
            particle_spacing: 30.0,
            header_threshold: 100.0,
            header_gutter: 20.0,
            font_stylesheets: Vec::new(),
            dom: DomContract::default(),
        }
    }
}

impl ShellConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ShellError::InvalidConfig(e.to_string()))
    }

    /// Reads the inline JSON config block, falling back to defaults.
    pub fn from_document(env: &dyn Environment) -> Self {
        let Some(element) = env.query(CONFIG_ELEMENT) else {
            return Self::default();
        };
        match Self::from_json(&element.text()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring landing config: {}", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(ShellError::InvalidConfig("storage_key is empty".to_string()));
        }
        if self.particle_spacing <= 0.0 {
            return Err(ShellError::InvalidConfig(
                "particle_spacing must be positive".to_string(),
            ));
        }
        if self.dom.menu_button.is_empty() || self.dom.sidebar.is_empty() {
            return Err(ShellError::InvalidConfig(
                "menu selectors must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
