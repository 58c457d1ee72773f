use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltwh};
use crate::identity;
use crate::Identity;

/// One decoded optical code as delivered by the scanner
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    #[serde(rename = "data")]
    pub payload: String,
    #[serde(rename = "rect")]
    pub bbox: BBox<Ltwh>,
    #[serde(default)]
    pub polygon: Option<Vec<na::Point2<i32>>>,
}

impl Detection {
    pub fn new<S: Into<String>>(payload: S, bbox: BBox<Ltwh>) -> Self {
        Self {
            payload: payload.into(),
            bbox,
            polygon: None,
        }
    }

    pub fn with_polygon(mut self, polygon: Vec<na::Point2<i32>>) -> Self {
        self.polygon = Some(polygon);
        self
    }

    #[inline]
    pub fn identity(&self) -> Option<Identity> {
        identity::resolve(&self.payload)
    }
}
