use crate::detector::FrameworkDetector;
use crate::extractor::routes::{HonoExtractor, ReceiverPolicy};
use crate::extractor::RouteRecord;
use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
use crate::parser::{AstParser, ParsedFile};
use crate::path_composer::{PathComposer, PathConvention};
use crate::scanner::FileScanner;
use crate::serializer::{self, write_to_file};
use crate::type_resolver::TypeResolver;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Hono OpenAPI Generator - Generate OpenAPI documentation from Hono TypeScript sources
#[derive(Parser, Debug)]
#[command(name = "hono-openapi-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Source files, directories or glob patterns (e.g. "src/**/*.ts")
    #[arg(value_name = "PATTERN", required = true, num_args = 1..)]
    pub patterns: Vec<String>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Resolve matched files to absolute paths
    #[arg(long = "absolute")]
    pub absolute: bool,

    /// Root of a grouped-routes tree: `route.ts` files take their directory as path prefix
    #[arg(long = "autoroute", value_name = "DIR", conflicts_with = "autorouter")]
    pub autoroute: Option<PathBuf>,

    /// Root of a folder-router tree: every file's location, with `[param]` folders,
    /// is its path prefix
    #[arg(long = "autorouter", value_name = "DIR")]
    pub autorouter: Option<PathBuf>,

    /// Only accept registrations on receivers typed as the Hono router, in files importing hono
    #[arg(long = "strict-receivers")]
    pub strict_receivers: bool,

    /// Title of the generated document
    #[arg(long = "title", default_value = "Generated API")]
    pub title: String,

    /// Version of the documented API
    #[arg(long = "api-version", default_value = "1.0.0")]
    pub api_version: String,

    /// Description of the documented API
    #[arg(long = "description")]
    pub description: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl From<OutputFormat> for serializer::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => serializer::OutputFormat::Yaml,
            OutputFormat::Json => serializer::OutputFormat::Json,
        }
    }
}

/// Everything [`generate`] needs besides the parsed files.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub convention: PathConvention,
    pub policy: ReceiverPolicy,
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            convention: PathConvention::None,
            policy: ReceiverPolicy::Permissive,
            title: "Generated API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
        }
    }
}

impl From<&CliArgs> for GenerateConfig {
    fn from(args: &CliArgs) -> Self {
        let convention = match (&args.autoroute, &args.autorouter) {
            (Some(root), _) => PathConvention::GroupedRoutes { root: root.clone() },
            (None, Some(root)) => PathConvention::FolderRouter { root: root.clone() },
            (None, None) => PathConvention::None,
        };
        let policy = if args.strict_receivers {
            ReceiverPolicy::RequireRouter
        } else {
            ReceiverPolicy::Permissive
        };
        Self {
            convention,
            policy,
            title: args.title.clone(),
            version: args.api_version.clone(),
            description: args.description.clone(),
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    for (flag, root) in [("--autoroute", &args.autoroute), ("--autorouter", &args.autorouter)] {
        if let Some(root) = root {
            if !root.is_dir() {
                anyhow::bail!("{} root is not a directory: {}", flag, root.display());
            }
        }
    }

    info!("Patterns: {}", args.patterns.join(" "));
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }
    if let Some(ref root) = args.autoroute {
        info!("Grouped routes root: {}", root.display());
    }
    if let Some(ref root) = args.autorouter {
        info!("Folder router root: {}", root.display());
    }
    if args.strict_receivers {
        info!("Receiver policy: strict");
    }

    Ok(args)
}

/// Runs extraction, path composition and assembly over already parsed files.
pub fn generate(parsed_files: &[ParsedFile], config: &GenerateConfig) -> OpenApiDocument {
    let type_resolver = TypeResolver::new(parsed_files);
    let extractor = HonoExtractor::new(&type_resolver).with_policy(config.policy);

    let mut routes: Vec<RouteRecord> = Vec::new();
    match config.policy {
        ReceiverPolicy::Permissive => {
            for file in parsed_files {
                routes.extend(extractor.extract_file(file));
            }
        }
        ReceiverPolicy::RequireRouter => {
            let detection = FrameworkDetector::detect(parsed_files);
            if detection.is_empty() {
                warn!("No file imports hono");
            }
            for file in parsed_files.iter().filter(|f| detection.contains(&f.path)) {
                routes.extend(extractor.extract_file(file));
            }
        }
    }
    debug!("Extracted {} routes", routes.len());

    let routes = PathComposer::new(config.convention.clone()).compose_all(routes);

    let mut builder = OpenApiBuilder::new().with_info(
        config.title.clone(),
        config.version.clone(),
        config.description.clone(),
    );
    builder.add_routes(&routes);
    builder.build()
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    // Step 1: Resolve patterns to source files
    info!("Scanning for source files...");
    let scan_result = FileScanner::new(args.patterns.clone())
        .with_absolute_paths(args.absolute)
        .scan()?;
    info!("Found {} source files", scan_result.files.len());
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }

    // Step 2: Parse files, skipping the ones that do not parse
    info!("Parsing source files...");
    let parsed_files: Vec<ParsedFile> = AstParser::parse_files(&scan_result.files)
        .into_iter()
        .filter_map(|r| match r {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping file: {}", e);
                None
            }
        })
        .collect();
    info!("Successfully parsed {} files", parsed_files.len());

    if parsed_files.is_empty() {
        anyhow::bail!("No files could be parsed successfully");
    }

    // Step 3: Extract routes and build the document
    info!("Building OpenAPI document...");
    let config = GenerateConfig::from(&args);
    let document = generate(&parsed_files, &config);
    let operation_count: usize = document
        .paths
        .values()
        .map(|item| {
            crate::extractor::HttpMethod::ALL
                .iter()
                .filter(|m| item.operation(**m).is_some())
                .count()
        })
        .sum();
    if operation_count == 0 {
        warn!("No routes found");
    }

    // Step 4: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = serializer::render(&document, args.output_format.into())?;

    // Step 5: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files scanned: {}", scan_result.files.len());
    info!("  - Files parsed: {}", parsed_files.len());
    info!("  - Paths: {}", document.paths.len());
    info!("  - Operations: {}", operation_count);

    Ok(())
}
