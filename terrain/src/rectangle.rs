//! Line-aligned sampling windows.
//!
//! A [`Rectangle`] is stored in the line's local frame: the line is
//! rotated about its midpoint until it runs along the positive x axis,
//! and the window is the axis-parallel box around it, expanded on
//! every side by `relative_buffer * length`.

use crate::TerrainError;
use geo::{
    geometry::{Coord, Line, LineString, Polygon, Rect},
    AffineTransform,
};
use log::debug;
use raster::C;

#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    /// Positional index of the originating link.
    pub id: usize,

    /// Window in the line's local frame.
    local: Rect<C>,

    /// Counter-clockwise angle from the world x axis to head→tail, in
    /// radians.
    angle: C,

    /// Midpoint of the line; fixed under rotation.
    pivot: Coord<C>,

    /// Line-of-sight height at local x = 0.
    constant: C,

    /// Line-of-sight height change per unit of local x.
    slope: C,

    /// Head to tail distance.
    length: C,
}

impl Rectangle {
    pub fn builder() -> RectangleBuilder {
        RectangleBuilder {
            id: 0,
            line: None,
            head_elev_m: None,
            tail_elev_m: None,
            relative_buffer: 0.0,
        }
    }

    fn new(
        id: usize,
        line: Line<C>,
        head_elev_m: C,
        tail_elev_m: C,
        relative_buffer: C,
    ) -> Result<Self, TerrainError> {
        let geometry_err = |reason| TerrainError::Geometry { id, reason };
        let finite = |c: Coord<C>| c.x.is_finite() && c.y.is_finite();
        if !finite(line.start) || !finite(line.end) {
            return Err(geometry_err("non-finite coordinate"));
        }
        if !head_elev_m.is_finite() || !tail_elev_m.is_finite() {
            return Err(geometry_err("non-finite elevation"));
        }
        let length = line.dx().hypot(line.dy());
        if length == 0.0 {
            return Err(geometry_err("zero-length line"));
        }

        let angle = line.dy().atan2(line.dx());
        let pivot = Coord {
            x: (line.start.x + line.end.x) / 2.0,
            y: (line.start.y + line.end.y) / 2.0,
        };
        let half_len = length / 2.0;
        let buffer = relative_buffer * length;
        let local = Rect::new(
            Coord {
                x: pivot.x - half_len - buffer,
                y: pivot.y - buffer,
            },
            Coord {
                x: pivot.x + half_len + buffer,
                y: pivot.y + buffer,
            },
        );

        let head_x = pivot.x - half_len;
        let slope = (tail_elev_m - head_elev_m) / length;
        let constant = head_elev_m - slope * head_x;

        Ok(Self {
            id,
            local,
            angle,
            pivot,
            constant,
            slope,
            length,
        })
    }

    /// Returns the window in the line's local frame.
    pub fn local_rect(&self) -> Rect<C> {
        self.local
    }

    /// Returns the rotation from world x axis to the line, in radians.
    pub fn angle(&self) -> C {
        self.angle
    }

    pub fn pivot(&self) -> Coord<C> {
        self.pivot
    }

    /// Returns the line-of-sight (constant, slope) pair.
    pub fn los(&self) -> (C, C) {
        (self.constant, self.slope)
    }

    pub fn length(&self) -> C {
        self.length
    }

    pub fn area(&self) -> C {
        self.local.width() * self.local.height()
    }

    /// Height of the line-of-sight at local coordinate `local_x`.
    pub fn los_height(&self, local_x: C) -> C {
        self.constant + self.slope * local_x
    }

    /// Returns the transform from the local frame to the world frame.
    pub fn world_transform(&self) -> AffineTransform<C> {
        rotation(self.angle, self.pivot)
    }

    pub fn to_world(&self, local: Coord<C>) -> Coord<C> {
        self.world_transform().apply(local)
    }

    pub fn to_local(&self, world: Coord<C>) -> Coord<C> {
        rotation(-self.angle, self.pivot).apply(world)
    }

    /// Returns the four world-frame corners, counter-clockwise from the
    /// corner behind the head on its right-hand side.
    pub fn corners(&self) -> [Coord<C>; 4] {
        let (min, max) = (self.local.min(), self.local.max());
        let transform = self.world_transform();
        [
            Coord { x: min.x, y: min.y },
            Coord { x: max.x, y: min.y },
            Coord { x: max.x, y: max.y },
            Coord { x: min.x, y: max.y },
        ]
        .map(|c| transform.apply(c))
    }

    /// Returns the window as a closed world-frame polygon.
    pub fn polygon(&self) -> Polygon<C> {
        Polygon::new(LineString::from(self.corners().to_vec()), vec![])
    }

    /// Returns the smallest axis-aligned world-frame box containing
    /// this window.
    pub fn bounding_rect(&self) -> Rect<C> {
        let [first, rest @ ..] = self.corners();
        let (min, max) = rest.iter().fold((first, first), |(min, max), c| {
            (
                Coord {
                    x: min.x.min(c.x),
                    y: min.y.min(c.y),
                },
                Coord {
                    x: max.x.max(c.x),
                    y: max.y.max(c.y),
                },
            )
        });
        Rect::new(min, max)
    }
}

/// Counter-clockwise rotation by `angle` radians about `pivot`.
fn rotation(angle: C, pivot: Coord<C>) -> AffineTransform<C> {
    let (sin, cos) = angle.sin_cos();
    AffineTransform::new(
        cos,
        -sin,
        pivot.x - cos * pivot.x + sin * pivot.y,
        sin,
        cos,
        pivot.y - sin * pivot.x - cos * pivot.y,
    )
}

pub struct RectangleBuilder {
    id: usize,
    line: Option<Line<C>>,
    head_elev_m: Option<C>,
    tail_elev_m: Option<C>,
    relative_buffer: C,
}

impl RectangleBuilder {
    #[must_use]
    pub fn id(mut self, id: usize) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn line(mut self, line: Line<C>) -> Self {
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn head_elev(mut self, meters: C) -> Self {
        self.head_elev_m = Some(meters);
        self
    }

    #[must_use]
    pub fn tail_elev(mut self, meters: C) -> Self {
        self.tail_elev_m = Some(meters);
        self
    }

    /// Fraction of the line's length to pad the window with on every
    /// side. Defaults to 0.
    #[must_use]
    pub fn relative_buffer(mut self, fraction: C) -> Self {
        self.relative_buffer = fraction;
        self
    }

    pub fn build(&self) -> Result<Rectangle, TerrainError> {
        let (Some(line), Some(head_elev_m), Some(tail_elev_m)) =
            (self.line, self.head_elev_m, self.tail_elev_m)
        else {
            return Err(TerrainError::Builder);
        };
        validate_buffer(self.relative_buffer)?;
        Rectangle::new(
            self.id,
            line,
            head_elev_m,
            tail_elev_m,
            self.relative_buffer,
        )
    }
}

fn validate_buffer(relative_buffer: C) -> Result<(), TerrainError> {
    if relative_buffer.is_finite() && relative_buffer >= 0.0 {
        Ok(())
    } else {
        Err(TerrainError::Buffer(relative_buffer))
    }
}

/// Builds one window per line.
///
/// Input slices must be the same length. Each output entry corresponds
/// to the line at the same position and is either a window or the
/// geometry error that prevented building it.
pub fn make_rectangles(
    lines: &[Line<C>],
    head_elevs: &[C],
    tail_elevs: &[C],
    relative_buffer: C,
) -> Result<Vec<Result<Rectangle, TerrainError>>, TerrainError> {
    if lines.len() != head_elevs.len() || lines.len() != tail_elevs.len() {
        return Err(TerrainError::Schema(format!(
            "{} lines, {} head elevations, {} tail elevations",
            lines.len(),
            head_elevs.len(),
            tail_elevs.len()
        )));
    }
    validate_buffer(relative_buffer)?;

    let rectangles: Vec<_> = lines
        .iter()
        .zip(head_elevs.iter().zip(tail_elevs))
        .enumerate()
        .map(|(id, (line, (head, tail)))| {
            Rectangle::new(id, *line, *head, *tail, relative_buffer)
        })
        .collect();
    debug!(
        "built {} of {} rectangles, buffer {relative_buffer}",
        rectangles.iter().filter(|r| r.is_ok()).count(),
        rectangles.len()
    );
    Ok(rectangles)
}
