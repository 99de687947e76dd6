use crate::error::FieldError;

/// One point of the swarm, in render-surface coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub brightness: f32,
    pub size: f32,
}

/// Axis-aligned spawn and containment rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Bounds {
    /// Checked constructor; degenerate or non-finite rectangles are rejected
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Result<Self, FieldError> {
        let bounds = Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn from_size(width: f32, height: f32) -> Result<Self, FieldError> {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.left + self.width() * 0.5,
            self.top + self.height() * 0.5,
        )
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        (self.left..=self.right).contains(&x) && (self.top..=self.bottom).contains(&y)
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        let (width, height) = (self.width(), self.height());
        let finite = [self.left, self.top, self.right, self.bottom, width, height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || width <= 0.0 || height <= 0.0 {
            return Err(FieldError::InvalidBounds { width, height });
        }
        Ok(())
    }
}
