//! Hex coordinate primitives (axial coordinates)
//!
//! Pure, stateless geometry consumed by the combat engine and AI. The engine
//! never does hex math inline; everything goes through this module.
//!
//! Two coordinate types: [`HexCoord`] for whole-hex positions and
//! [`FracHex`] for sub-hex interpolation during movement.

use serde::{Deserialize, Serialize};

/// Axial hex coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Third cube axis; `q + r + s` is always zero
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Grid distance in hex steps
    pub fn distance(&self, other: &Self) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// The six adjacent hexes, counterclockwise starting east
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [
            HexCoord::new(self.q + 1, self.r),
            HexCoord::new(self.q + 1, self.r - 1),
            HexCoord::new(self.q, self.r - 1),
            HexCoord::new(self.q - 1, self.r),
            HexCoord::new(self.q - 1, self.r + 1),
            HexCoord::new(self.q, self.r + 1),
        ]
    }

    /// Every hex on the straight line to `other`, endpoints included
    pub fn line_to(&self, other: &Self) -> Vec<HexCoord> {
        let n = self.distance(other) as i32;
        if n == 0 {
            return vec![*self];
        }

        let mut results = Vec::with_capacity((n + 1) as usize);
        for i in 0..=n {
            let t = i as f32 / n as f32;
            let q = self.q as f32 + (other.q - self.q) as f32 * t;
            let r = self.r as f32 + (other.r - self.r) as f32 * t;
            results.push(Self::round(q, r));
        }
        results
    }

    /// Snap a fractional axial coordinate to its containing hex, correcting
    /// the axis that rounded worst so the cube constraint still holds
    pub fn round(q: f32, r: f32) -> Self {
        let s = -q - r;
        let mut rq = q.round();
        let mut rr = r.round();
        let rs = s.round();

        let q_diff = (rq - q).abs();
        let r_diff = (rr - r).abs();
        let s_diff = (rs - s).abs();

        if q_diff > r_diff && q_diff > s_diff {
            rq = -rr - rs;
        } else if r_diff > s_diff {
            rr = -rq - rs;
        }

        Self::new(rq as i32, rr as i32)
    }
}

impl From<HexCoord> for FracHex {
    fn from(h: HexCoord) -> Self {
        FracHex::new(h.q as f32, h.r as f32)
    }
}

/// Fractional axial coordinate for sub-hex movement within a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct FracHex {
    pub q: f32,
    pub r: f32,
}

impl FracHex {
    pub fn new(q: f32, r: f32) -> Self {
        Self { q, r }
    }

    /// Nearest whole hex
    pub fn rounded(&self) -> HexCoord {
        HexCoord::round(self.q, self.r)
    }

    /// Linear blend toward `to` by `fraction` in [0, 1]
    pub fn lerp(&self, to: &FracHex, fraction: f32) -> FracHex {
        let t = fraction.clamp(0.0, 1.0);
        FracHex::new(self.q + (to.q - self.q) * t, self.r + (to.r - self.r) * t)
    }
}
