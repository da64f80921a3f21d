//! Routier &ndash; a URI template router that compiles its routing tree
//! into a specialized decision program.
//!
//! Templates mix literal text with field expressions
//! (`/items/{id:int}`, `/img/{name}.{ext}`, `/files/{rest:path}`) and are
//! checked strictly against each other at registration: ambiguous or
//! conflicting templates are rejected rather than silently shadowed. The
//! first lookup after a registration lowers the tree into an immutable
//! decision program executed with minimal branching, shared across threads
//! without locking.
//!
//! ```
//! use routier::{RouteOptions, Router};
//!
//! let mut router = Router::new();
//! router.add_route("/items/{id:int}", "items", RouteOptions::default())?;
//!
//! let m = router.find("/items/42").expect("route matches");
//! assert_eq!(*m.resource, "items");
//! assert_eq!(m.params["id"].as_int(), Some(42));
//! # Ok::<(), routier::RouterError>(())
//! ```
#![warn(missing_docs)]
#![doc(test(no_crate_inject, attr(deny(warnings))))]

pub mod converters;
mod error;
pub mod helpers;
mod options;
mod program;
mod router;
mod template;
mod tree;

pub use crate::converters::{FieldValue, Fragment, ParamMap};
pub use crate::error::{InvalidConverterName, RouterError, UnacceptableRouteError};
pub use crate::options::{ConverterMap, RouterOptions};
pub use crate::router::{
    MethodMapper, NoopMethodMapper, ResponderKind, RouteMatch, RouteOptions, Router,
};
