//! Isochrone weather-routing engine for sailing vessels.
//!
//! Built from the bottom up: [`geomath`] carries the spherical-earth
//! primitives, [`polar`] interpolates boat speed from a performance
//! table, [`wind`] and [`validity`] define the external data contracts
//! (wind field, land/obstacle masking), [`isochrone`] runs the frontier
//! expansion-and-pruning kernel, [`router`] wraps it into named routing
//! strategies, and [`driver`] steps a strategy leg by leg across a track
//! of waypoints. [`geojson`] renders a routed path for downstream
//! consumers.

pub mod driver;
pub mod error;
pub mod geojson;
pub mod geomath;
pub mod isochrone;
pub mod polar;
pub mod router;
pub mod validity;
pub mod wind;

pub use driver::RoutingDriver;
pub use error::{PolarError, RoutingError};
pub use polar::Polar;
pub use router::{list_routing_algorithms, PolarRouter, Router, RoutingResult, ShortestPathRouter};
