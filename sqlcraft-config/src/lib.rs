//! # sqlcraft-config
//!
//! Configuration and mapper document ingestion (§4.7, §6): turns
//! `<configuration>`/`<mapper>` XML (or, for interface ingestion, a
//! hand-built [`interface::MethodDescriptor`]) into an immutable
//! [`configuration::Configuration`], resolving forward references
//! (`resultMap@extends`, `cache-ref`) and applying database-id filtering
//! along the way.

#![deny(missing_docs)]
#![warn(unused_imports)]

mod builder;
mod config_document;
mod configuration;
mod database_id;
mod environment;
mod interface;
mod mapper;
mod result_map_doc;
mod settings_doc;
mod sql_body;
mod xml;

pub use builder::ConfigurationBuilder;
pub use config_document::{parse_config_document, ConfigDocument, MapperReference};
pub use configuration::Configuration;
pub use database_id::DatabaseIdProvider;
pub use environment::{CacheSpec, Environment, Environments, PluggableSpec};
pub use interface::{resolve_parameter_object, CollectionHint, MethodDescriptor, ParamDescriptor, ParamKind};
pub use mapper::{parse_mapper_document, ParsedMapperDocument, ParsedStatement};
pub use settings_doc::build_settings;
