mod collection;
mod controller;
mod fragment;
mod meta_cache;
mod metadata;
mod queue;
mod registry;
mod rodio_sink;
mod track;
mod traits;
mod types;

pub(crate) use collection::*;
pub(crate) use controller::*;
pub(crate) use fragment::*;
pub(crate) use meta_cache::*;
pub(crate) use metadata::*;
pub(crate) use queue::*;
pub(crate) use registry::*;
pub(crate) use rodio_sink::*;
pub(crate) use track::*;
pub(crate) use traits::*;
pub(crate) use types::*;

#[cfg(test)]
mod queue_tests;
