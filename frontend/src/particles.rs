use std::cell::RefCell;
use std::rc::Rc;

use crate::config::ShellConfig;
use crate::env::{Element, Env};
use crate::error::{Result, ShellError};
use crate::frame::FrameLoop;

pub const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";
const PARTICLE_CLASS: &str = "particle";
const SIZE_RANGE_PX: (f64, f64) = (2.0, 6.0);
const FLOAT_DURATION_S: (f64, f64) = (10.0, 30.0);
const MAX_SPEED: f64 = 0.5;
const BOUNDS: (f64, f64) = (0.0, 100.0);

fn in_range(rng: &mut fastrand::Rng, (low, high): (f64, f64)) -> f64 {
    low + rng.f64() * (high - low)
}

/// Position and velocity in percent of the container, per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleMotion {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl ParticleMotion {
    pub fn random(rng: &mut fastrand::Rng) -> Self {
        Self {
            x: in_range(rng, BOUNDS),
            y: in_range(rng, BOUNDS),
            vx: in_range(rng, (-MAX_SPEED, MAX_SPEED)),
            vy: in_range(rng, (-MAX_SPEED, MAX_SPEED)),
        }
    }

    /// One frame of travel. Crossing an edge flips that velocity component
    /// and pins the position to the edge.
    pub fn advance(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
        if self.x < BOUNDS.0 || self.x > BOUNDS.1 {
            self.vx = -self.vx;
            self.x = self.x.clamp(BOUNDS.0, BOUNDS.1);
        }
        if self.y < BOUNDS.0 || self.y > BOUNDS.1 {
            self.vy = -self.vy;
            self.y = self.y.clamp(BOUNDS.0, BOUNDS.1);
        }
    }
}

struct Particle {
    motion: ParticleMotion,
    element: Element,
}

impl Particle {
    fn sync(&self) {
        self.element.set_style("left", &format!("{:.3}%", self.motion.x));
        self.element.set_style("top", &format!("{:.3}%", self.motion.y));
    }
}

pub struct ParticleField {
    env: Env,
    container: Option<Element>,
    max_particles: usize,
    spacing: f64,
    min_width: f64,
    particles: Rc<RefCell<Vec<Particle>>>,
    frames: FrameLoop,
}

impl ParticleField {
    pub fn new(env: Env, config: &ShellConfig) -> Self {
        Self {
            container: env.query(&config.dom.particle_container),
            max_particles: config.max_particles,
            spacing: config.particle_spacing,
            min_width: config.mobile_breakpoint,
            particles: Rc::new(RefCell::new(Vec::new())),
            frames: FrameLoop::new(env.clone()),
            env,
        }
    }

    pub fn particle_count(&self, viewport_width: f64) -> usize {
        let by_width = (viewport_width / self.spacing).floor().max(0.0) as usize;
        by_width.min(self.max_particles)
    }

    pub fn len(&self) -> usize {
        self.particles.borrow().len()
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.frames.is_running()
    }

    /// Builds the field for the current viewport. Returns the number of
    /// particles created; zero when the field is skipped.
    pub fn init(&self) -> Result<usize> {
        self.destroy();
        let Some(container) = &self.container else {
            return Ok(0);
        };
        let width = self.env.viewport().width;
        if width < self.min_width {
            log::debug!("particle field skipped at {}px", width);
            return Ok(0);
        }
        if self.env.media_matches(REDUCED_MOTION_QUERY) == Some(true) {
            log::debug!("particle field skipped, reduced motion requested");
            return Ok(0);
        }

        let mut rng = fastrand::Rng::with_seed(self.env.random_seed());
        let count = self.particle_count(width);
        let mut created: Vec<Particle> = Vec::with_capacity(count);
        let discard = |created: &[Particle]| created.iter().for_each(|p| p.element.remove());
        for _ in 0..count {
            let element = match self.env.create_element("div") {
                Ok(element) => element,
                Err(e) => {
                    discard(&created);
                    return Err(e);
                }
            };
            let size = in_range(&mut rng, SIZE_RANGE_PX);
            let duration = in_range(&mut rng, FLOAT_DURATION_S);
            let offset = rng.f64() * duration;
            element.add_class(PARTICLE_CLASS);
            element.set_style("width", &format!("{:.2}px", size));
            element.set_style("height", &format!("{:.2}px", size));
            element.set_style("animation-duration", &format!("{:.2}s", duration));
            element.set_style("animation-delay", &format!("-{:.2}s", offset));

            let particle = Particle {
                motion: ParticleMotion::random(&mut rng),
                element,
            };
            particle.sync();
            if let Err(e) = container.append_child(&particle.element) {
                discard(&created);
                return Err(ShellError::Dom(format!("particle append failed: {}", e)));
            }
            created.push(particle);
        }

        *self.particles.borrow_mut() = created;
        self.start_loop();
        log::debug!("particle field built with {} particles", count);
        Ok(count)
    }

    fn start_loop(&self) {
        let particles = self.particles.clone();
        self.frames.start(move |_| {
            for particle in particles.borrow_mut().iter_mut() {
                particle.motion.advance();
                particle.sync();
            }
        });
    }

    pub fn pause(&self) {
        self.frames.stop();
    }

    pub fn resume(&self) {
        if !self.frames.is_running() && self.len() > 0 {
            self.start_loop();
        }
    }

    pub fn destroy(&self) {
        self.frames.stop();
        for particle in self.particles.borrow_mut().drain(..) {
            particle.element.remove();
        }
    }

    pub fn rebuild(&self) -> Result<usize> {
        self.destroy();
        self.init()
    }
}
