use crate::config::ShellConfig;
use crate::env::{ConnectionInfo, Env};

const MIN_CORES: u32 = 4;
const SLOW_CONNECTIONS: &[&str] = &["slow-2g", "2g"];
pub const LOW_PERFORMANCE_CLASS: &str = "low-performance";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceProfile {
    pub low_concurrency: bool,
    pub slow_network: bool,
}

impl DeviceProfile {
    pub fn detect(cores: Option<u32>, connection: Option<&ConnectionInfo>) -> Self {
        Self {
            low_concurrency: cores.map(|c| c < MIN_CORES).unwrap_or(false),
            slow_network: connection
                .map(|c| c.save_data || SLOW_CONNECTIONS.contains(&c.effective_type.as_str()))
                .unwrap_or(false),
        }
    }

    pub fn is_constrained(&self) -> bool {
        self.low_concurrency || self.slow_network
    }
}

/// Trims decorative effects on weak devices and preloads font stylesheets.
pub struct PerformanceGuard {
    env: Env,
    lazy_images: String,
    fonts: Vec<String>,
}

impl PerformanceGuard {
    pub fn new(env: Env, config: &ShellConfig) -> Self {
        Self {
            env,
            lazy_images: config.dom.lazy_images.clone(),
            fonts: config.font_stylesheets.clone(),
        }
    }

    pub fn init(&self) -> DeviceProfile {
        let profile = DeviceProfile::detect(
            self.env.hardware_concurrency(),
            self.env.connection().as_ref(),
        );
        if profile.is_constrained() {
            log::info!("constrained device detected: {:?}", profile);
            self.disable_decorative_effects();
        }
        self.preload_fonts();
        profile
    }

    fn disable_decorative_effects(&self) {
        if let Some(body) = self.env.body() {
            body.add_class(LOW_PERFORMANCE_CLASS);
        }
        for image in self.env.query_all(&self.lazy_images) {
            image.set_attribute("loading", "eager");
            image.set_style("transition", "none");
        }
    }

    /// Adds one `<link rel="preload" as="style">` per configured stylesheet.
    pub fn preload_fonts(&self) -> usize {
        let Some(head) = self.env.head() else { return 0 };
        let existing: Vec<String> = head
            .query_all("link")
            .iter()
            .filter_map(|l| l.attribute("href"))
            .collect();

        let mut added = 0;
        for href in self.fonts.iter().filter(|h| !existing.contains(h)) {
            let link = match self.env.create_element("link") {
                Ok(link) => link,
                Err(e) => {
                    log::debug!("font preload skipped: {}", e);
                    continue;
                }
            };
            link.set_attribute("rel", "preload");
            link.set_attribute("as", "style");
            link.set_attribute("href", href);
            if head.append_child(&link).is_ok() {
                added += 1;
            }
        }
        added
    }
}
