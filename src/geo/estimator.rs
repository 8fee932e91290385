//! Distance and travel-time estimation over coordinate pairs.
//!
//! Great-circle distance via haversine, then a piecewise speed model by
//! distance band:
//!
//! - urban (≤ `urban_max_miles`): surface-street average speed
//! - regional: mixed highway
//! - interstate: sustained highway
//! - long-haul: sustained speed plus a fixed schedule-padding percentage
//!   for rest stops
//!
//! Estimates are floored at a minimum trip time (a same-location pair never
//! takes zero minutes) and capped at a ceiling that only exists to bound
//! pathological extreme-distance pairs. A cap application is tagged
//! `tier = capped` so audits can separate clamped cells from modeled ones;
//! the cap is never a stand-in for an unresolved coordinate.

use crate::domain::{Coord, EngineConfig, EstimationTier};
use crate::error::{AppError, ErrorKind};

/// Mean Earth radius in miles.
const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Great-circle distance in miles. Symmetric in its arguments.
pub fn haversine_miles(a: Coord, b: Coord) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin() * EARTH_RADIUS_MILES
}

/// Estimate door-to-door minutes between two resolved centroids.
///
/// Returns `(distance_miles, minutes, tier)`.
pub fn estimate(
    origin: Coord,
    dest: Coord,
    config: &EngineConfig,
) -> Result<(f64, f64, EstimationTier), AppError> {
    for (label, c) in [("origin", origin), ("destination", dest)] {
        if !(c.lat.is_finite() && c.lon.is_finite()) {
            return Err(AppError::new(
                ErrorKind::UnresolvedCoordinate,
                format!("Non-finite {label} coordinate: ({}, {})", c.lat, c.lon),
            ));
        }
    }

    let distance = haversine_miles(origin, dest);

    let (raw_minutes, tier) = if distance <= config.urban_max_miles {
        (distance / config.urban_mph * 60.0, EstimationTier::Urban)
    } else if distance <= config.regional_max_miles {
        (
            distance / config.regional_mph * 60.0,
            EstimationTier::Regional,
        )
    } else if distance <= config.interstate_max_miles {
        (
            distance / config.interstate_mph * 60.0,
            EstimationTier::Interstate,
        )
    } else {
        (
            distance / config.longhaul_mph * 60.0 * (1.0 + config.longhaul_padding),
            EstimationTier::Longhaul,
        )
    };

    let floored = raw_minutes.max(config.trip_floor_minutes);
    if floored > config.trip_cap_minutes {
        return Ok((distance, config.trip_cap_minutes, EstimationTier::Capped));
    }
    Ok((distance, floored, tier))
}
