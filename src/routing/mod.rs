//! Route integration.
//!
//! Routes are producers: they decide what to render and hand requests to the
//! [`RenderRegistry`](crate::engine::RenderRegistry). They never talk to
//! outlets directly.
//!
//! - [`router`] - what the render core needs from a host router
//! - [`query_params`] - declared query params, typed reads and the diff cache
//! - [`component_route`] - route hooks and the binding that drives them

pub mod component_route;
pub mod query_params;
pub mod router;

pub use component_route::{ComponentRoute, RenderOptions, RouteBinding, RouteRenderer, RouterContext};
pub use query_params::{
    deserialize_query_param, serialize_query_param, QueryParam, QueryParamCache, QueryParamsDiff,
};
pub use router::{HostRouter, RouteTree};
