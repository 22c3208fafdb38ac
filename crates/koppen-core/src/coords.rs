//! Geographic coordinate types and hemisphere selection.
//! All coordinate math uses f64 for precision.

/// A grid-cell centre in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn hemisphere(self) -> Hemisphere {
        Hemisphere::from_lat(self.lat)
    }
}

/// Hemisphere of a cell; decides which half-year counts as summer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    North,
    South,
}

/// Zero-based month indices of April through September.
const APR_TO_SEP: [usize; 6] = [3, 4, 5, 6, 7, 8];
/// Zero-based month indices of January–March and October–December.
const OCT_TO_MAR: [usize; 6] = [0, 1, 2, 9, 10, 11];

impl Hemisphere {
    /// The equator itself counts as northern.
    pub fn from_lat(lat: f64) -> Self {
        if lat >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        }
    }

    /// Zero-based month indices of the warm half-year.
    pub fn summer_months(self) -> [usize; 6] {
        match self {
            Hemisphere::North => APR_TO_SEP,
            Hemisphere::South => OCT_TO_MAR,
        }
    }

    /// Zero-based month indices of the cold half-year.
    pub fn winter_months(self) -> [usize; 6] {
        match self {
            Hemisphere::North => OCT_TO_MAR,
            Hemisphere::South => APR_TO_SEP,
        }
    }
}
