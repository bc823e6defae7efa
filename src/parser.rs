use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// AST (Abstract Syntax Tree) parser for TypeScript and JavaScript source files.
///
/// The `AstParser` uses tree-sitter to parse source code into a concrete syntax tree,
/// which can then be analyzed to extract route registrations, handler bodies and type
/// declarations. `.tsx` and `.jsx` files use the TSX grammar, everything else the
/// TypeScript grammar (which also accepts plain JavaScript).
///
/// # Example
///
/// ```no_run
/// use hono_openapi_from_source::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/index.ts")).unwrap();
/// println!("Root node: {}", parsed.root().kind());
/// ```
pub struct AstParser;

/// A successfully parsed source file with its syntax tree.
///
/// Owns both the source text and the tree, so nodes borrowed from the tree can always
/// be resolved back to their text.
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The full source text
    pub source: String,
    /// The parsed syntax tree
    pub tree: Tree,
}

impl ParsedFile {
    /// Root node of the syntax tree.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }
}

impl AstParser {
    /// Parses a single source file into a syntax tree.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains syntax errors
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)?;
        Self::parse_source(path, content)
    }

    /// Parses source text that was already loaded, attributing it to `path`.
    ///
    /// tree-sitter always produces a tree; a tree containing error or missing nodes is
    /// rejected here so that callers skip the file instead of mining a broken tree.
    pub fn parse_source(path: &Path, source: impl Into<String>) -> Result<ParsedFile> {
        let source = source.into();

        let mut parser = Parser::new();
        if Self::uses_tsx(path) {
            parser.set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())?;
        } else {
            parser.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())?;
        }

        let tree = parser.parse(&source, None).ok_or_else(|| Error::ParseError {
            file: path.to_path_buf(),
            message: "parser produced no tree".to_string(),
        })?;

        if tree.root_node().has_error() {
            return Err(Error::ParseError {
                file: path.to_path_buf(),
                message: "source contains syntax errors".to_string(),
            });
        }

        debug!("Successfully parsed file: {}", path.display());

        Ok(ParsedFile {
            path: path.to_path_buf(),
            source,
            tree,
        })
    }

    /// Parses multiple source files, continuing even if some fail.
    ///
    /// Files that fail to parse are logged as warnings, but parsing continues for remaining
    /// files. This allows the tool to generate partial documentation even when some files
    /// have syntax errors.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<ParsedFile>> = paths
            .iter()
            .map(|path| match Self::parse_file(path) {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    Err(e)
                }
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        let failure_count = results.len() - success_count;

        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count, failure_count
        );

        results
    }

    fn uses_tsx(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("tsx") | Some("jsx")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_parse_valid_typescript_file() {
        let temp_dir = TempDir::new().unwrap();
        let valid_code = r#"
            import { Hono } from 'hono'

            interface User {
                id: number
                name: string
            }

            const app = new Hono()
            app.get('/users/:id', (c) => c.json({ id: c.req.param('id') }))

            export default app
        "#;

        let file_path = create_temp_file(&temp_dir, "valid.ts", valid_code);
        let parsed = AstParser::parse_file(&file_path).unwrap();

        assert_eq!(parsed.path, file_path);
        assert_eq!(parsed.root().kind(), "program");
        assert!(parsed.root().named_child_count() >= 4);
    }

    #[test]
    fn test_parse_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_code = r#"
            const app = new Hono(
            app.get('/users', (c) => {
                return c.json({ broken: }
        "#;

        let file_path = create_temp_file(&temp_dir, "invalid.ts", invalid_code);
        let result = AstParser::parse_file(&file_path);

        assert!(matches!(result, Err(Error::ParseError { .. })));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = AstParser::parse_file(Path::new("/nonexistent/file.ts"));

        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[test]
    fn test_parse_empty_file() {
        let parsed = AstParser::parse_source(Path::new("empty.ts"), "").unwrap();
        assert_eq!(parsed.root().named_child_count(), 0);
    }

    #[test]
    fn test_parse_tsx_file() {
        let code = r#"
            const page = () => <div>{'hello'}</div>
            app.get('/page', (c) => c.html(page()))
        "#;

        assert!(AstParser::parse_source(Path::new("page.tsx"), code).is_ok());
    }

    #[test]
    fn test_parse_files_batch() {
        let temp_dir = TempDir::new().unwrap();

        let file1 = create_temp_file(&temp_dir, "a.ts", "export const a = 1");
        let file2 = create_temp_file(
            &temp_dir,
            "b.ts",
            "export function b(): string { return 'b' }",
        );
        let file3 = create_temp_file(&temp_dir, "c.ts", "export const = (");

        let results = AstParser::parse_files(&[file1.clone(), file2.clone(), file3]);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
        assert_eq!(results[1].as_ref().unwrap().path, file2);
    }

    #[test]
    fn test_parse_files_empty_list() {
        let paths: Vec<PathBuf> = vec![];
        assert!(AstParser::parse_files(&paths).is_empty());
    }

    #[test]
    fn test_text_of_node() {
        let parsed = AstParser::parse_source(Path::new("t.ts"), "const greeting = 'hi'").unwrap();
        assert_eq!(parsed.text(parsed.root()), "const greeting = 'hi'");
    }
}
