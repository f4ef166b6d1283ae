//! Schema-adaptive mapping between Notion databases and MiniVault records.
//!
//! Reads go page → [`extract`] per resolved property → [`NormalizedRecord`].
//! Writes go raw input → [`build`] keyed on the *resolved* property type → Notion payload.
//! The schema is fetched once per request through a [`SchemaSource`] and never cached.
//!
//! [`NormalizedRecord`]: minivault_core::NormalizedRecord

pub mod build;
pub mod extract;
pub mod project;
pub mod resolve;
pub mod template;

pub use build::{build, plan_write, BuildError, WritePlan};
pub use extract::extract;
pub use project::{project, project_page, UNTITLED};
pub use resolve::{resolve, ResolvedField, ResolvedFieldMap, SchemaSource};
pub use template::{creation_properties, CreationSchema};

pub const CRATE_NAME: &str = "minivault-mapper";
