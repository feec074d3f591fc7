// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod debounce;
pub mod error;
pub mod ids;
pub mod model;
pub mod owner;
pub mod pagination;
pub mod panel;
pub mod query;
pub mod render;
pub mod slot;
pub mod tabs;

pub use debounce::*;
pub use error::*;
pub use ids::*;
pub use model::*;
pub use owner::*;
pub use pagination::*;
pub use panel::*;
pub use query::*;
pub use render::*;
pub use slot::*;
pub use tabs::*;
