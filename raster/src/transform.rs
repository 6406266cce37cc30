use crate::C;
use geo::geometry::{Coord, Rect};

/// Maps between world coordinates and (fractional) pixel coordinates
/// of a north-up raster.
///
/// Pixel `(col, row)` covers the area from `(col, row)` to
/// `(col + 1, row + 1)` in pixel space; rows grow southward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// World coordinate of the outer north-west corner of pixel
    /// `(0, 0)`.
    pub origin: Coord<C>,

    /// Pixel width and height in world units, both positive.
    pub pixel_size: Coord<C>,
}

impl GeoTransform {
    pub fn new(origin: Coord<C>, pixel_size: Coord<C>) -> Self {
        Self { origin, pixel_size }
    }

    /// Returns the world coordinate of a fractional pixel position.
    pub fn pixel_to_world(&self, pixel: Coord<C>) -> Coord<C> {
        Coord {
            x: self.origin.x + pixel.x * self.pixel_size.x,
            y: self.origin.y - pixel.y * self.pixel_size.y,
        }
    }

    /// Returns the fractional pixel position of a world coordinate.
    pub fn world_to_pixel(&self, coord: Coord<C>) -> Coord<C> {
        Coord {
            x: (coord.x - self.origin.x) / self.pixel_size.x,
            y: (self.origin.y - coord.y) / self.pixel_size.y,
        }
    }

    /// Returns the world coordinate of the center of pixel `(col, row)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn pixel_center(&self, (col, row): (usize, usize)) -> Coord<C> {
        self.pixel_to_world(Coord {
            x: col as C + 0.5,
            y: row as C + 0.5,
        })
    }

    /// Returns the area covered by a raster of `(cols, rows)` pixels.
    #[allow(clippy::cast_precision_loss)]
    pub fn extent(&self, (cols, rows): (usize, usize)) -> Rect<C> {
        let far = self.pixel_to_world(Coord {
            x: cols as C,
            y: rows as C,
        });
        Rect::new(self.origin, far)
    }

    pub(crate) fn is_valid(&self) -> bool {
        let Coord { x, y } = self.pixel_size;
        x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0
    }
}
