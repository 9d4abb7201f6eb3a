//! Reviews for any registered kind of record.
//!
//! Records are registered in a [`registry::TypeRegistry`] under a type tag.
//! Reviews point at them through a [`models::target::TargetRef`], are saved
//! through [`store::ReviewStore`], and are shown on pages by the directives
//! in [`tags`]. New reviews come in through [`submission::ReviewSubmitter`].

pub mod config;
pub mod db;
pub mod forms;
pub mod logging;
pub mod models;
pub mod registry;
pub mod render;
pub mod store;
pub mod submission;
pub mod tags;
pub mod word_filter;

#[cfg(feature = "server")]
pub mod api;
