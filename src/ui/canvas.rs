use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    symbols::Marker,
    widgets::{
        Block, Widget,
        canvas::{Canvas, Circle, Points},
    },
};

use crate::error::FieldError;
use crate::field::{Bounds, Particle};

/// Braille cells are 2 dots wide and 4 dots tall
const DOTS_PER_COLUMN: f32 = 2.0;
const DOTS_PER_ROW: f32 = 4.0;

/// Read-only renderer for the particle field.
///
/// Field coordinates are braille dots with y growing downward; the canvas has
/// y growing upward, so rows are flipped here and nowhere else.
pub struct FieldCanvas<'a> {
    particles: &'a [Particle],
    bounds: Bounds,
    block: Option<Block<'a>>,
}

impl<'a> FieldCanvas<'a> {
    pub fn new(particles: &'a [Particle], bounds: Bounds) -> Self {
        Self {
            particles,
            bounds,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for FieldCanvas<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bounds = self.bounds;
        let particles = self.particles;

        let mut canvas = Canvas::default()
            .marker(Marker::Braille)
            .background_color(Color::Black)
            .x_bounds([bounds.left as f64, bounds.right as f64])
            .y_bounds([bounds.top as f64, bounds.bottom as f64])
            .paint(move |ctx| {
                for p in particles {
                    let (x, y) = to_canvas(p, &bounds);
                    let color = particle_color(p.brightness);
                    ctx.draw(&Circle {
                        x,
                        y,
                        radius: p.size as f64,
                        color,
                    });
                    ctx.draw(&Points {
                        coords: &[(x, y)],
                        color,
                    });
                }
            });

        if let Some(block) = self.block {
            canvas = canvas.block(block);
        }

        canvas.render(area, buf);
    }
}

/// Field bounds matching a canvas area at braille resolution
pub fn field_bounds_for(area: Rect) -> Result<Bounds, FieldError> {
    Bounds::from_size(
        area.width as f32 * DOTS_PER_COLUMN,
        area.height as f32 * DOTS_PER_ROW,
    )
}

pub fn to_canvas(p: &Particle, bounds: &Bounds) -> (f64, f64) {
    (p.x as f64, (bounds.top + bounds.bottom - p.y) as f64)
}

/// Cyan scaled by brightness; terminals have no alpha to fade with
pub fn particle_color(brightness: f32) -> Color {
    let b = brightness.clamp(0.0, 1.0);
    Color::Rgb(0, (200.0 * b) as u8, (255.0 * b) as u8)
}
