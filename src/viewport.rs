//! Camera translation from the host map to the guest library.
//!
//! The host reports longitude that may drift past the antimeridian, zoom one
//! level higher than the guest expects, and clockwise rotation. The guest also
//! needs a field of view corrected for asymmetric padding on short screens.

use serde::{Deserialize, Serialize};

use crate::host::HostMap;

/// Field of view the guest camera is built with before padding correction.
pub const DEFAULT_FOVY: f64 = 60.0;

/// Screens shorter than this are treated as this tall when correcting the
/// field of view.
const MIN_CALCULATION_SCREEN_HEIGHT: f64 = 1000.0;

/// Viewport id handed to the guest library.
pub const VIEWPORT_ID: &str = "2gis";

/// Map padding in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    /// Top inset.
    pub top: f64,
    /// Right inset.
    pub right: f64,
    /// Bottom inset.
    pub bottom: f64,
    /// Left inset.
    pub left: f64,
}

/// Camera parameters in the guest library's convention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    /// Longitude in `[-180, 180)`.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Guest zoom (host zoom minus one).
    pub zoom: f64,
    /// Guest bearing (negated host rotation), degrees.
    pub bearing: f64,
    /// Pitch in degrees.
    pub pitch: f64,
    /// Map padding.
    pub padding: Padding,
    /// Whether to render world copies. Always `false`.
    pub repeat: bool,
    /// Vertical field of view, degrees, corrected for padding.
    pub fovy: f64,
}

/// One viewport per host frame, shared by every layer drawn in that frame.
///
/// Coordinates follow the top-left screen convention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Viewport id.
    pub id: String,
    /// Left edge in CSS pixels.
    pub x: f64,
    /// Top edge in CSS pixels.
    pub y: f64,
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
    /// Camera parameters.
    #[serde(flatten)]
    pub view_state: ViewState,
    /// Near plane multiplier matching the host projection.
    pub near_z_multiplier: f64,
}

/// Normalize a longitude into `[-180, 180)`.
///
/// `185` becomes `-175`, `-185` becomes `175`.
#[must_use]
pub fn normalize_longitude(lng: f64) -> f64 {
    let wrapped = (lng + 540.0).rem_euclid(360.0) - 180.0;
    // rem_euclid may round up to exactly 360 for tiny negative inputs.
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Scale `fovy` for a viewport whose padding shifts the visible center.
///
/// `pitch` is in degrees. Returns `fovy` unchanged when the effective height
/// offset is not positive.
#[must_use]
pub fn fov_correction(size: [f64; 2], pitch: f64, padding: Padding, fovy: f64) -> f64 {
    let padding_top = (padding.top - padding.bottom).max(0.0) * pitch.to_radians().tan();
    let screen_height = size[1].max(MIN_CALCULATION_SCREEN_HEIGHT) + padding_top;

    let effective_height =
        (padding.bottom - padding.top) / 2.0 + (screen_height - size[1]) / 2.0;

    if effective_height > 0.0 {
        100.0 / effective_height * fovy
    } else {
        fovy
    }
}

/// Derive the guest view state from the host camera.
pub fn view_state<M: HostMap + ?Sized>(map: &M) -> ViewState {
    let [lng, lat] = map.center();
    let pitch = map.pitch();
    let padding = map.padding();
    ViewState {
        longitude: normalize_longitude(lng),
        latitude: lat,
        zoom: map.zoom() - 1.0,
        bearing: -map.rotation(),
        pitch,
        padding,
        repeat: false,
        fovy: fov_correction(map.size(), pitch, padding, DEFAULT_FOVY),
    }
}

/// Build the viewport for the current host frame.
pub fn viewport<M: HostMap + ?Sized>(map: &M) -> Viewport {
    let [width, height] = map.size();
    Viewport {
        id: VIEWPORT_ID.to_owned(),
        x: 0.0,
        y: 0.0,
        width,
        height,
        view_state: view_state(map),
        near_z_multiplier: 1.0 / if height > 0.0 { height } else { 1.0 },
    }
}
