use crate::parser::ParsedFile;
use crate::syntax;
use log::debug;
use std::path::PathBuf;
use tree_sitter::Node;

/// Module specifier of the routing framework.
const FRAMEWORK_MODULE: &str = "hono";

/// Framework detector for identifying which source files use the Hono router.
///
/// A file uses the framework when it imports `hono` or one of its subpath modules
/// (`hono/cors`, `hono/factory`, ...), either with an `import` declaration or a
/// `require('hono')` call. Scoped middleware packages (`@hono/zod-validator`) do not count.
pub struct FrameworkDetector;

/// Result of framework detection.
pub struct DetectionResult {
    /// Files importing the framework, in input order
    pub framework_files: Vec<PathBuf>,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.framework_files.is_empty()
    }

    pub fn contains(&self, path: &std::path::Path) -> bool {
        self.framework_files.iter().any(|p| p == path)
    }
}

impl FrameworkDetector {
    /// Detects the files importing the framework.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use hono_openapi_from_source::detector::FrameworkDetector;
    /// use hono_openapi_from_source::parser::AstParser;
    /// use std::path::Path;
    ///
    /// let parsed = AstParser::parse_file(Path::new("src/index.ts")).unwrap();
    /// let result = FrameworkDetector::detect(&[parsed]);
    /// println!("{} file(s) import hono", result.framework_files.len());
    /// ```
    pub fn detect(parsed_files: &[ParsedFile]) -> DetectionResult {
        debug!("Detecting framework imports in {} files", parsed_files.len());

        let framework_files: Vec<PathBuf> = parsed_files
            .iter()
            .filter(|file| Self::imports_framework(file))
            .map(|file| file.path.clone())
            .collect();

        debug!("Files importing {}: {:?}", FRAMEWORK_MODULE, framework_files);
        DetectionResult { framework_files }
    }

    /// Whether `file` imports the framework.
    pub fn imports_framework(file: &ParsedFile) -> bool {
        let mut found = false;
        syntax::walk_tree(file.root(), |node| {
            if found {
                return;
            }
            found = match node.kind() {
                "import_statement" | "export_statement" => node
                    .child_by_field_name("source")
                    .is_some_and(|source| Self::is_framework_specifier(file, source)),
                "call_expression" => Self::is_require(file, node),
                _ => false,
            };
        });
        found
    }

    fn is_require(file: &ParsedFile, call: Node<'_>) -> bool {
        let is_require = call
            .child_by_field_name("function")
            .is_some_and(|f| matches!(file.text(f), "require" | "import"));
        is_require
            && syntax::call_args(call)
                .first()
                .is_some_and(|arg| Self::is_framework_specifier(file, *arg))
    }

    fn is_framework_specifier(file: &ParsedFile, node: Node<'_>) -> bool {
        syntax::string_value(file, node).is_some_and(|specifier| {
            specifier == FRAMEWORK_MODULE
                || specifier
                    .strip_prefix(FRAMEWORK_MODULE)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
