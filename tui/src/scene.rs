//! Scene
//!
//! A drifting starfield standing in for the application the prompts pause.
//! It only moves while the host is not paused, which makes the pause switch
//! visible.

use std::time::Duration;

use rand::Rng;
use ratatui::buffer::Buffer;
use ratatui::style::Style;

use crate::theme::{HILLS, SCENE_BG, STAR_BRIGHT, STAR_DIM};

/// Stars per 100 cells
const STAR_DENSITY: f32 = 1.5;

/// Columns per second for the nearest stars
const DRIFT_SPEED: f32 = 6.0;

struct Star {
    x: f32,
    y: u16,
    near: bool,
}

/// Background scene state
pub struct Scene {
    stars: Vec<Star>,
    width: u16,
    height: u16,
    phase: f32,
}

impl Scene {
    /// Scene filling `width` × `height` cells
    pub fn new(width: u16, height: u16) -> Self {
        let mut scene = Self {
            stars: Vec::new(),
            width,
            height,
            phase: 0.0,
        };
        scene.populate();
        scene
    }

    fn populate(&mut self) {
        let mut rng = rand::thread_rng();
        let count = (f32::from(self.width) * f32::from(self.height) * STAR_DENSITY / 100.0) as usize;
        self.stars = (0..count)
            .map(|_| Star {
                x: rng.gen_range(0.0..f32::from(self.width.max(1))),
                y: rng.gen_range(0..self.height.max(1)),
                near: rng.gen_bool(0.3),
            })
            .collect();
    }

    /// Refill for a new terminal size
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.populate();
    }

    /// Advance the animation by `dt` unless paused
    pub fn update(&mut self, dt: Duration, paused: bool) {
        if paused || self.width == 0 {
            return;
        }
        let secs = dt.as_secs_f32();
        let width = f32::from(self.width);
        for star in &mut self.stars {
            let speed = if star.near { DRIFT_SPEED } else { DRIFT_SPEED / 3.0 };
            star.x -= speed * secs;
            if star.x < 0.0 {
                star.x += width;
            }
        }
        self.phase += secs;
    }

    /// Draw into `buf` (layer-local coordinates)
    pub fn render(&self, buf: &mut Buffer) {
        let area = buf.area;
        for y in 0..area.height {
            for x in 0..area.width {
                buf[(x, y)].set_symbol(" ").set_bg(SCENE_BG);
            }
        }

        for star in &self.stars {
            let x = star.x as u16;
            if x < area.width && star.y < area.height {
                let (symbol, color) = if star.near { ("*", STAR_BRIGHT) } else { (".", STAR_DIM) };
                buf[(x, star.y)].set_symbol(symbol).set_fg(color);
            }
        }

        // Hills scroll with the stars
        for x in 0..area.width {
            let wave = ((f32::from(x) + self.phase * DRIFT_SPEED) / 9.0).sin();
            let rise = (1.5 + wave * 1.5).round() as u16;
            for dy in 0..=rise {
                if let Some(y) = area.height.checked_sub(1 + dy) {
                    buf.set_string(x, y, "▀", Style::default().fg(HILLS).bg(HILLS));
                }
            }
        }
    }

    /// Animation clock, in seconds of unpaused time
    pub fn elapsed(&self) -> f32 {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use ratatui::layout::Rect;

    use super::*;

    #[test]
    fn test_paused_scene_does_not_move() {
        let mut scene = Scene::new(40, 10);
        scene.update(Duration::from_secs(1), true);
        assert_eq!(scene.elapsed(), 0.0);

        scene.update(Duration::from_millis(500), false);
        assert!((scene.elapsed() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_render_fills_background() {
        let scene = Scene::new(20, 6);
        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 6));
        scene.render(&mut buf);
        assert_eq!(buf[(0, 0)].bg, SCENE_BG);
        assert_eq!(buf[(0, 5)].bg, HILLS);
    }
}
