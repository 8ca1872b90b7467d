//! Positions, dimensions, cube coordinates, and the polymorphic [`Grid`]
//! contract with its three shape implementations. The hex implementation
//! reuses `hexx::Hex` for coordinate storage, following the same
//! `to_hex`/`from_hex` conversion convention used elsewhere in this lineage
//! for hex-grid positions, generalized here to an arbitrary map shape
//! instead of a single circular radius bound.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A point in continuous space. Used by the gridless shape and as the
/// common coordinate surface squares are sampled against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn euclidean_distance(self, other: Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub origin: Position,
    pub dimensions: Dimensions,
}

impl Rectangle {
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.origin.x
            && pos.x <= self.origin.x + self.dimensions.width
            && pos.y >= self.origin.y
            && pos.y <= self.origin.y + self.dimensions.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Position,
    pub radius: f64,
}

impl Circle {
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        self.center.euclidean_distance(pos) <= self.radius
    }
}

/// Cube hex coordinate. The invariant `x + y + z == 0` holds for every
/// value constructed through [`CubeCoordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CubeCoordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CubeCoordinate {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, z: -x - y }
    }

    #[must_use]
    pub fn to_hex(self) -> hexx::Hex {
        hexx::Hex::new(self.x, self.y)
    }

    #[must_use]
    pub fn from_hex(hex: hexx::Hex) -> Self {
        Self::new(hex.x(), hex.y())
    }

    #[must_use]
    pub fn distance_to(self, other: CubeCoordinate) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        let dz = (self.z - other.z).unsigned_abs();
        (dx + dy + dz) / 2
    }

    #[must_use]
    pub fn to_position(self) -> Position {
        Position::new(f64::from(self.x), f64::from(self.y))
    }

    const DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

    #[must_use]
    pub fn neighbors(self) -> [CubeCoordinate; 6] {
        Self::DIRECTIONS.map(|(dx, dy)| Self::new(self.x + dx, self.y + dy))
    }

    /// Round a fractional cube coordinate to the nearest valid cell by
    /// adjusting the component with the largest rounding error.
    #[must_use]
    pub fn round(fx: f64, fy: f64, fz: f64) -> CubeCoordinate {
        let mut rx = fx.round();
        let mut ry = fy.round();
        let rz = fz.round();

        let dx = (rx - fx).abs();
        let dy = (ry - fy).abs();
        let dz = (rz - fz).abs();

        if dx > dy && dx > dz {
            rx = -ry - rz;
        } else if dy > dz {
            ry = -rx - rz;
        }
        CubeCoordinate {
            x: rx as i32,
            y: ry as i32,
            z: -(rx as i32) - (ry as i32),
        }
    }

    /// Linear interpolation cube line from `self` to `other`, inclusive.
    #[must_use]
    pub fn line_to(self, other: CubeCoordinate) -> Vec<CubeCoordinate> {
        let n = self.distance_to(other).max(1);
        (0..=n)
            .map(|i| {
                let t = f64::from(i) / f64::from(n);
                let fx = f64::from(self.x) + (f64::from(other.x - self.x)) * t;
                let fy = f64::from(self.y) + (f64::from(other.y - self.y)) * t;
                let fz = f64::from(self.z) + (f64::from(other.z - self.z)) * t;
                Self::round(fx, fy, fz)
            })
            .collect()
    }
}

/// Which geometry a [`Grid`] implements. Distance, neighborhood, and line
/// semantics differ per shape; see `SPEC_FULL.md` §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridShape {
    Square,
    Hex,
    Gridless,
}

/// Direction vector plus half-angle for a cone query.
#[derive(Debug, Clone, Copy)]
pub struct Cone {
    pub direction: (f64, f64),
    pub half_angle_radians: f64,
    pub length: f64,
}

/// Uniform spatial contract over the three supported geometries.
pub trait Grid: Send + Sync {
    fn shape(&self) -> GridShape;

    /// Whether `pos` lies within the grid's bounds.
    fn is_valid(&self, pos: Position) -> bool;

    /// Distance between two positions, in the grid's native unit.
    fn distance(&self, from: Position, to: Position) -> f64;

    /// All positions directly adjacent to `pos`.
    fn neighbors(&self, pos: Position) -> Vec<Position>;

    fn is_adjacent(&self, a: Position, b: Position) -> bool {
        self.neighbors(a)
            .iter()
            .any(|n| (n.x - b.x).abs() < 1e-6 && (n.y - b.y).abs() < 1e-6)
    }

    /// Sequence of positions forming a line from `from` to `to`, inclusive
    /// of both endpoints.
    fn line_of_sight(&self, from: Position, to: Position) -> Vec<Position>;

    /// All valid positions within `radius` of `center`, inclusive.
    fn positions_in_range(&self, center: Position, radius: f64) -> Vec<Position>;

    fn positions_in_rectangle(&self, rect: Rectangle) -> Vec<Position> {
        self.positions_in_range(
            rect.origin,
            rect.dimensions.width.max(rect.dimensions.height),
        )
        .into_iter()
        .filter(|p| rect.contains(*p))
        .collect()
    }

    fn positions_in_circle(&self, circle: Circle) -> Vec<Position> {
        self.positions_in_range(circle.center, circle.radius)
            .into_iter()
            .filter(|p| circle.contains(*p))
            .collect()
    }

    fn positions_in_cone(&self, origin: Position, cone: Cone) -> Vec<Position> {
        let (dx, dy) = cone.direction;
        let dir_len = (dx * dx + dy * dy).sqrt().max(1e-9);
        self.positions_in_range(origin, cone.length)
            .into_iter()
            .filter(|p| {
                let vx = p.x - origin.x;
                let vy = p.y - origin.y;
                let v_len = (vx * vx + vy * vy).sqrt();
                if v_len < 1e-9 {
                    return true;
                }
                let cos_angle = (vx * dx + vy * dy) / (v_len * dir_len);
                cos_angle.clamp(-1.0, 1.0).acos() <= cone.half_angle_radians
            })
            .collect()
    }
}

/// Chebyshev-distance square grid with an 8-direction neighborhood,
/// bounded `[0, width) x [0, height)`.
pub struct SquareGrid {
    pub width: i32,
    pub height: i32,
}

impl SquareGrid {
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl Grid for SquareGrid {
    fn shape(&self) -> GridShape {
        GridShape::Square
    }

    fn is_valid(&self, pos: Position) -> bool {
        pos.x >= 0.0 && pos.y >= 0.0 && pos.x < f64::from(self.width) && pos.y < f64::from(self.height)
    }

    fn distance(&self, from: Position, to: Position) -> f64 {
        (from.x - to.x).abs().max((from.y - to.y).abs())
    }

    fn neighbors(&self, pos: Position) -> Vec<Position> {
        let mut out = Vec::with_capacity(8);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let candidate = Position::new(pos.x + f64::from(dx), pos.y + f64::from(dy));
                if self.is_valid(candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    fn line_of_sight(&self, from: Position, to: Position) -> Vec<Position> {
        bresenham_line(from, to)
    }

    fn positions_in_range(&self, center: Position, radius: f64) -> Vec<Position> {
        let r = radius.floor() as i32;
        let mut out = Vec::new();
        for dx in -r..=r {
            for dy in -r..=r {
                let candidate = Position::new(center.x + f64::from(dx), center.y + f64::from(dy));
                if self.is_valid(candidate) && self.distance(center, candidate) <= radius {
                    out.push(candidate);
                }
            }
        }
        out
    }
}

fn bresenham_line(from: Position, to: Position) -> Vec<Position> {
    let mut x0 = from.x as i32;
    let mut y0 = from.y as i32;
    let x1 = to.x as i32;
    let y1 = to.y as i32;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut out = Vec::new();
    loop {
        out.push(Position::new(f64::from(x0), f64::from(y0)));
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
    out
}

/// Cube-coordinate hex grid bounded to a radius from the origin. Supports
/// pointy-top or flat-top orientation, matching `hexx::HexOrientation`.
pub struct HexGrid {
    pub orientation: hexx::HexOrientation,
    pub radius: u32,
}

impl HexGrid {
    #[must_use]
    pub fn new(orientation: hexx::HexOrientation, radius: u32) -> Self {
        Self { orientation, radius }
    }

    fn to_cube(pos: Position) -> CubeCoordinate {
        CubeCoordinate::new(pos.x as i32, pos.y as i32)
    }
}

impl Grid for HexGrid {
    fn shape(&self) -> GridShape {
        GridShape::Hex
    }

    fn is_valid(&self, pos: Position) -> bool {
        let cube = Self::to_cube(pos);
        cube.distance_to(CubeCoordinate::new(0, 0)) <= self.radius
    }

    fn distance(&self, from: Position, to: Position) -> f64 {
        f64::from(Self::to_cube(from).distance_to(Self::to_cube(to)))
    }

    fn neighbors(&self, pos: Position) -> Vec<Position> {
        Self::to_cube(pos)
            .neighbors()
            .into_iter()
            .map(CubeCoordinate::to_position)
            .filter(|p| self.is_valid(*p))
            .collect()
    }

    fn line_of_sight(&self, from: Position, to: Position) -> Vec<Position> {
        Self::to_cube(from)
            .line_to(Self::to_cube(to))
            .into_iter()
            .map(CubeCoordinate::to_position)
            .collect()
    }

    fn positions_in_range(&self, center: Position, radius: f64) -> Vec<Position> {
        let c = Self::to_cube(center);
        let r = radius as i32;
        let mut out = Vec::new();
        for dx in -r..=r {
            for dy in (-r).max(-dx - r)..=r.min(-dx + r) {
                let candidate = CubeCoordinate::new(c.x + dx, c.y + dy);
                let pos = candidate.to_position();
                if self.is_valid(pos) {
                    out.push(pos);
                }
            }
        }
        out
    }
}

/// Unbounded Euclidean space with an 8-direction conceptual neighborhood
/// sampled at unit distance.
pub struct GridlessSpace;

impl Grid for GridlessSpace {
    fn shape(&self) -> GridShape {
        GridShape::Gridless
    }

    fn is_valid(&self, _pos: Position) -> bool {
        true
    }

    fn distance(&self, from: Position, to: Position) -> f64 {
        from.euclidean_distance(to)
    }

    fn neighbors(&self, pos: Position) -> Vec<Position> {
        let mut out = Vec::with_capacity(8);
        for dx in [-1.0, 0.0, 1.0] {
            for dy in [-1.0, 0.0, 1.0] {
                if dx == 0.0 && dy == 0.0 {
                    continue;
                }
                out.push(Position::new(pos.x + dx, pos.y + dy));
            }
        }
        out
    }

    fn line_of_sight(&self, from: Position, to: Position) -> Vec<Position> {
        let distance = from.euclidean_distance(to).round().max(1.0) as u32;
        (0..=distance)
            .map(|i| {
                let t = f64::from(i) / f64::from(distance);
                Position::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
            })
            .collect()
    }

    fn positions_in_range(&self, center: Position, radius: f64) -> Vec<Position> {
        let r = radius.ceil() as i32;
        let mut out = Vec::new();
        for dx in -r..=r {
            for dy in -r..=r {
                let candidate = Position::new(center.x + f64::from(dx), center.y + f64::from(dy));
                if self.distance(center, candidate) <= radius {
                    out.push(candidate);
                }
            }
        }
        out
    }
}

/// Construct a grid from a shape tag and its dimensions. `dimensions` is
/// interpreted as `(width, height)` for square grids and `(radius, _)` for
/// hex grids; ignored for gridless space.
pub fn build_grid(shape: GridShape, dimensions: (i32, i32)) -> EngineResult<Box<dyn Grid>> {
    match shape {
        GridShape::Square => {
            if dimensions.0 <= 0 || dimensions.1 <= 0 {
                return Err(EngineError::invalid_argument(
                    "square grid dimensions must be positive",
                ));
            }
            Ok(Box::new(SquareGrid::new(dimensions.0, dimensions.1)))
        }
        GridShape::Hex => {
            if dimensions.0 <= 0 {
                return Err(EngineError::invalid_argument("hex grid radius must be positive"));
            }
            Ok(Box::new(HexGrid::new(
                hexx::HexOrientation::Pointy,
                dimensions.0 as u32,
            )))
        }
        GridShape::Gridless => Ok(Box::new(GridlessSpace)),
    }
}
