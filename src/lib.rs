//! Hono OpenAPI Generator - OpenAPI documentation from Hono TypeScript sources.
//!
//! This library recovers the HTTP surface of a service built on the Hono router by static
//! analysis of its TypeScript sources, without executing them, and emits it as an OpenAPI 3.0
//! document.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Resolves file patterns and directories to source files
//! 2. [`parser`] - Parses sources into tree-sitter syntax trees
//! 3. [`detector`] - Finds the files importing hono
//! 4. [`extractor`] - Recognizes route registrations, responses and request data
//! 5. [`type_resolver`] - The type oracle: resolves the types of expressions and annotations
//! 6. [`schema_generator`] - Converts types to OpenAPI schemas
//! 7. [`path_composer`] - Applies folder-based routing conventions to route paths
//! 8. [`openapi_builder`] - Constructs the complete OpenAPI document
//! 9. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use hono_openapi_from_source::{
//!     extractor::{routes::HonoExtractor, RouteExtractor},
//!     openapi_builder::OpenApiBuilder,
//!     parser::AstParser,
//!     path_composer::{PathComposer, PathConvention},
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//!     type_resolver::TypeResolver,
//! };
//!
//! let scan_result = FileScanner::new(vec!["src/**/*.ts".to_string()]).scan().unwrap();
//! let parsed_files: Vec<_> = AstParser::parse_files(&scan_result.files)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//!
//! let type_resolver = TypeResolver::new(&parsed_files);
//! let routes = HonoExtractor::new(&type_resolver).extract_routes(&parsed_files);
//! let routes = PathComposer::new(PathConvention::None).compose_all(routes);
//!
//! let mut builder = OpenApiBuilder::new();
//! builder.add_routes(&routes);
//! let yaml = serialize_yaml(&builder.build()).unwrap();
//! println!("{}", yaml);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod scanner;
pub mod parser;
pub mod detector;
pub mod extractor;
pub mod syntax;
pub mod type_resolver;
pub mod schema_generator;
pub mod path_composer;
pub mod openapi_builder;
pub mod serializer;
pub mod error;
