use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

use crate::Frame;

pub trait BBoxFormat: std::fmt::Debug + Copy + PartialEq {}

/// Left-top-width-height format, as reported by the code scanner
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Integer pixel box. Serialized as a plain `[i32; 4]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(from = "[i32; 4]", into = "[i32; 4]", bound = "")]
pub struct BBox<F: BBoxFormat>([i32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [i32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> From<[i32; 4]> for BBox<F> {
    fn from(raw: [i32; 4]) -> Self {
        BBox(raw, PhantomData)
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[i32; 4] {
        &self.0
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(left: i32, top: i32, width: i32, height: i32) -> Self {
        BBox([left, top, width, height], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> i32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> i32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> i32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> i32 {
        self.0[3]
    }

    // widened so scanner values near the i32 limits cannot overflow
    #[inline(always)]
    pub fn right(&self) -> i64 {
        self.left() as i64 + self.width() as i64
    }

    #[inline(always)]
    pub fn bottom(&self) -> i64 {
        self.top() as i64 + self.height() as i64
    }

    /// Bottom-center of the box, where a carrier stands on the floor.
    #[inline]
    pub fn foot_point(&self) -> na::Point2<f32> {
        na::Point2::new(
            (self.left() as f64 + self.width() as f64 / 2.0) as f32,
            self.bottom() as f32,
        )
    }

    /// True when the box reaches into the `margin`-wide band along any edge
    /// of the frame.
    pub fn touches_border(&self, frame: &Frame, margin: i32) -> bool {
        let (fw, fh) = (frame.width() as i64, frame.height() as i64);
        let m = margin as i64;

        (self.left() as i64) < m
            || (self.top() as i64) < m
            || self.right() > fw - m
            || self.bottom() > fh - m
    }
}
