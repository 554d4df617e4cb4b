//! Hex coordinate math for a pointy-top grid
//!
//! Axial coordinates `(q, r)` are the identity of a cell. Pixel positions are
//! always derived from them through a [`HexLayout`]. Chunks store cells in
//! odd-r offset form `(col, row)`, where odd rows are shifted right by half a
//! hex width.
//!
//! The grid math is done by `hexx`. Its pointy layout maps +r to +y, which is
//! down on screen here, so no axis flip is needed.

use std::ops::{Add, Sub};

use glam::{IVec2, Vec2};
use hexx::{Hex, HexOrientation, OffsetHexMode, shapes};
use serde::{Deserialize, Serialize};

pub const SQRT_3: f32 = 1.732_050_8;

/// Axial hex coordinate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const ZERO: HexCoord = HexCoord { q: 0, r: 0 };

    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Third cube component (q + r + s = 0)
    pub fn s(self) -> i32 {
        -self.q - self.r
    }

    pub fn neighbors(self) -> [HexCoord; 6] {
        Hex::from(self).all_neighbors().map(HexCoord::from)
    }

    /// Number of steps between two hexes
    pub fn distance(self, other: HexCoord) -> i32 {
        Hex::from(self).distance_to(other.into())
    }

    /// Convert from odd-r offset `(col, row)`
    pub fn from_offset(offset: IVec2) -> Self {
        Hex::from_offset_coordinates(offset.to_array(), OffsetHexMode::Odd, HexOrientation::Pointy).into()
    }

    /// Convert to odd-r offset `(col, row)`
    pub fn to_offset(self) -> IVec2 {
        IVec2::from_array(Hex::from(self).to_offset_coordinates(OffsetHexMode::Odd, HexOrientation::Pointy))
    }
}

impl From<Hex> for HexCoord {
    fn from(hex: Hex) -> Self {
        Self::new(hex.x, hex.y)
    }
}

impl From<HexCoord> for Hex {
    fn from(coord: HexCoord) -> Self {
        Hex::new(coord.q, coord.r)
    }
}

impl Add for HexCoord {
    type Output = HexCoord;

    fn add(self, rhs: HexCoord) -> HexCoord {
        (Hex::from(self) + Hex::from(rhs)).into()
    }
}

impl Sub for HexCoord {
    type Output = HexCoord;

    fn sub(self, rhs: HexCoord) -> HexCoord {
        (Hex::from(self) - Hex::from(rhs)).into()
    }
}

/// Unrounded axial coordinate produced by pixel conversion
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractionalHex {
    pub q: f32,
    pub r: f32,
}

impl FractionalHex {
    /// Cube-round to the nearest valid hex
    pub fn round(self) -> HexCoord {
        // Project onto a unit grid and let hexx snap the point
        let unit = grid(1.0, Vec2::ZERO);
        let q_axis = unit.hex_to_world_pos(Hex::new(1, 0));
        let r_axis = unit.hex_to_world_pos(Hex::new(0, 1));
        unit.world_pos_to_hex(q_axis * self.q + r_axis * self.r).into()
    }
}

/// Pointy `hexx` layout with circumradius `size` and hex (0, 0) at `origin`
fn grid(size: f32, origin: Vec2) -> hexx::HexLayout {
    hexx::HexLayout {
        scale: [size, size].into(),
        origin: origin.to_array().into(),
        ..Default::default()
    }
}

/// Pixel position of a hex center relative to the axial origin
pub fn hex_to_pixel(hex: HexCoord, size: f32) -> Vec2 {
    HexLayout::new(size, Vec2::ZERO).hex_to_pixel(hex)
}

/// Exact inverse of [`hex_to_pixel`]
pub fn pixel_to_hex(x: f32, y: f32, size: f32) -> FractionalHex {
    HexLayout::new(size, Vec2::ZERO).pixel_to_hex(Vec2::new(x, y))
}

/// Round fractional axial coordinates to the nearest valid hex
pub fn hex_round(q: f32, r: f32) -> HexCoord {
    FractionalHex { q, r }.round()
}

/// The six vertices of a pointy-top hex, at 30°, 90°, ... 330°
pub fn hex_corners(center: Vec2, size: f32) -> [Vec2; 6] {
    let mut corners = grid(size, Vec2::ZERO)
        .center_aligned_hex_corners()
        .map(|corner| Vec2::from_array(corner.to_array()));
    corners.sort_by(|a, b| winding_angle(*a).total_cmp(&winding_angle(*b)));
    corners.map(|corner| center + corner)
}

/// Degrees past the 30° corner, with slack for rounding
fn winding_angle(corner: Vec2) -> f32 {
    (corner.y.atan2(corner.x).to_degrees() - 29.0).rem_euclid(360.0)
}

/// Every hex within `range` steps of `center`, including it
pub fn hexes_within(center: HexCoord, range: u32) -> Vec<HexCoord> {
    shapes::hexagon(center.into(), range).map(HexCoord::from).collect()
}

/// Size and pixel origin of a hex grid
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HexLayout {
    /// Circumradius in pixels
    pub size: f32,
    /// Pixel position of hex (0, 0)
    pub origin: Vec2,
}

impl HexLayout {
    pub fn new(size: f32, origin: Vec2) -> Self {
        Self { size, origin }
    }

    /// Layout whose odd-r offset cell `(col, row)` is centered inside the
    /// rectangle `[col·W, (col+1)·W) × [row·VS, (row+1)·VS)` for even rows
    pub fn offset_aligned(size: f32) -> Self {
        let width = SQRT_3 * size;
        let vertical_spacing = 1.5 * size;
        Self::new(size, Vec2::new(width / 2.0, vertical_spacing / 2.0))
    }

    pub fn width(&self) -> f32 {
        SQRT_3 * self.size
    }

    pub fn height(&self) -> f32 {
        2.0 * self.size
    }

    /// Distance between the centers of two adjacent rows
    pub fn vertical_spacing(&self) -> f32 {
        1.5 * self.size
    }

    fn grid(&self) -> hexx::HexLayout {
        grid(self.size, self.origin)
    }

    pub fn hex_to_pixel(&self, hex: HexCoord) -> Vec2 {
        Vec2::from_array(self.grid().hex_to_world_pos(hex.into()).to_array())
    }

    pub fn pixel_to_hex(&self, pixel: Vec2) -> FractionalHex {
        let [q, r] = self.grid().world_pos_to_fract_hex(pixel.to_array().into()).to_array();
        FractionalHex { q, r }
    }

    pub fn hex_at(&self, pixel: Vec2) -> HexCoord {
        self.grid().world_pos_to_hex(pixel.to_array().into()).into()
    }

    /// Snap a pixel to the exact center of the hex containing it
    pub fn pixel_to_hex_center(&self, pixel: Vec2) -> (Vec2, HexCoord) {
        let hex = self.hex_at(pixel);
        (self.hex_to_pixel(hex), hex)
    }

    pub fn corners(&self, hex: HexCoord) -> [Vec2; 6] {
        hex_corners(self.hex_to_pixel(hex), self.size)
    }
}
