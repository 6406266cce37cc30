use geo::geometry::{Coord, Line};
use raster::C;

/// One observed transmission attempt between a transmitter (head) and
/// a receiver (tail).
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Transmitter to receiver, in the raster's coordinate system.
    pub line: Line<C>,

    /// Transmitter antenna elevation.
    pub head_elev_m: C,

    /// Receiver antenna elevation.
    pub tail_elev_m: C,

    /// Whether the transmission was received, if known.
    pub success: Option<bool>,

    pub timestamp: Option<String>,

    pub id: Option<String>,
}

impl Link {
    pub fn head(&self) -> Coord<C> {
        self.line.start
    }

    pub fn tail(&self) -> Coord<C> {
        self.line.end
    }

    /// Planar distance from head to tail.
    pub fn length(&self) -> C {
        self.line.dx().hypot(self.line.dy())
    }
}

#[cfg(test)]
mod tests {
    use super::{Coord, Line, Link};

    #[test]
    fn test_link_length() {
        let link = Link {
            line: Line::new(Coord { x: 1.0, y: 1.0 }, Coord { x: 4.0, y: 5.0 }),
            head_elev_m: 0.0,
            tail_elev_m: 0.0,
            success: Some(true),
            timestamp: None,
            id: None,
        };
        assert_eq!(link.length(), 5.0);
        assert_eq!(link.head(), Coord { x: 1.0, y: 1.0 });
        assert_eq!(link.tail(), Coord { x: 4.0, y: 5.0 });
    }
}
