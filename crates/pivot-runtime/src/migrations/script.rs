//! Migration file content: sections, checksum and statement splitting.

use std::path::Path;

use sha2::{Digest, Sha256};

use pivot_core::error::{PivotError, Result};
use pivot_core::migration::{DOWN_MARKER, IRREVERSIBLE_MARKER, UP_MARKER};

/// A migration file split into its two sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    /// Text between the up and down markers.
    pub up: String,
    /// Text after the down marker to end of file.
    pub down: String,
    /// Descriptions from `-- Irreversible:` lines in the down section.
    pub irreversible: Vec<String>,
}

impl MigrationScript {
    /// Split file content into sections. `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut up = String::new();
        let mut down = String::new();
        let mut irreversible = Vec::new();
        let mut seen_up = false;
        let mut seen_down = false;
        let mut section = Section::Preamble;

        for line in content.lines() {
            if line.starts_with(UP_MARKER) {
                seen_up = true;
                section = Section::Up;
                continue;
            }
            if line.starts_with(DOWN_MARKER) {
                seen_down = true;
                section = Section::Down;
                continue;
            }

            let buf = match section {
                Section::Preamble => continue,
                Section::Up => &mut up,
                Section::Down => {
                    if let Some(what) = line.strip_prefix(IRREVERSIBLE_MARKER) {
                        irreversible.push(what.trim().to_string());
                    }
                    &mut down
                }
            };
            buf.push_str(line);
            buf.push('\n');
        }

        if !seen_up {
            return Err(PivotError::MalformedMigration {
                path: path.to_path_buf(),
                reason: format!("missing '{}' marker", UP_MARKER),
            });
        }

        // Generated files always carry both markers; a missing down marker
        // means the file was cut short.
        if !seen_down {
            return Err(PivotError::MalformedMigration {
                path: path.to_path_buf(),
                reason: format!("missing '{}' marker", DOWN_MARKER),
            });
        }

        Ok(Self {
            up,
            down,
            irreversible,
        })
    }

    /// Whether the down section can undo the up section.
    ///
    /// False when any change was marked irreversible or there is nothing to run.
    pub fn is_reversible(&self) -> bool {
        self.irreversible.is_empty() && !split_sql_statements(&self.down).is_empty()
    }
}

#[derive(Clone, Copy)]
enum Section {
    Preamble,
    Up,
    Down,
}

/// SHA-256 of migration content as lowercase hex.
pub fn checksum(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Split SQL into statements on `;`, ignoring semicolons inside quotes
/// (`'`, `"`, `` ` ``) and comments. `--` and `#` line comments and `/* */`
/// block comments are dropped; MySQL `/*! */` version comments are kept
/// verbatim. Comment-only fragments are dropped.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut comment = Comment::None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match comment {
            Comment::Line => {
                if c == '\n' {
                    comment = Comment::None;
                    current.push(c);
                }
                continue;
            }
            Comment::Block { keep } => {
                if keep {
                    current.push(c);
                }
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    if keep {
                        current.push('/');
                    } else {
                        current.push(' ');
                    }
                    comment = Comment::None;
                }
                continue;
            }
            Comment::None => {}
        }

        match quote {
            Some(q) => {
                current.push(c);
                if c == '\\' && q != '`' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == q {
                    // Doubled quote is an escaped quote.
                    if chars.peek() == Some(&q) {
                        chars.next();
                        current.push(q);
                    } else {
                        quote = None;
                    }
                }
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    current.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    comment = Comment::Line;
                }
                '#' => comment = Comment::Line,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let keep = chars.peek() == Some(&'!');
                    if keep {
                        current.push_str("/*");
                    }
                    comment = Comment::Block { keep };
                }
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }

    push_statement(&mut statements, &current);
    statements
}

#[derive(Clone, Copy)]
enum Comment {
    None,
    Line,
    Block { keep: bool },
}

fn push_statement(statements: &mut Vec<String>, fragment: &str) {
    let stmt = fragment.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "20240101120000000_migration.sql";

    #[test]
    fn test_parse_sections() {
        let content = "-- Up migration\nCREATE TABLE users (\nid INT NOT NULL\n);\n\n-- Down migration\nDROP TABLE users;\n";
        let script = MigrationScript::parse(content, Path::new(PATH)).unwrap();

        assert_eq!(script.up, "CREATE TABLE users (\nid INT NOT NULL\n);\n\n");
        assert_eq!(script.down, "DROP TABLE users;\n");
        assert!(script.irreversible.is_empty());
        assert!(script.is_reversible());
    }

    #[test]
    fn test_parse_irreversible_marker() {
        let content = "-- Up migration\nDROP TABLE legacy;\n\n-- Down migration\n-- Irreversible: table legacy removed\n";
        let script = MigrationScript::parse(content, Path::new(PATH)).unwrap();

        assert_eq!(script.irreversible, vec!["table legacy removed"]);
        assert!(!script.is_reversible());
    }

    #[test]
    fn test_empty_down_is_not_reversible() {
        let content = "-- Up migration\nSELECT 1;\n\n-- Down migration\n";
        let script = MigrationScript::parse(content, Path::new(PATH)).unwrap();
        assert!(!script.is_reversible());
    }

    #[test]
    fn test_missing_down_marker_is_malformed() {
        // What an interrupted write leaves behind.
        let content = "-- Up migration\nCREATE TABLE users (id INT);\nCREATE TABLE ord";
        let err = MigrationScript::parse(content, Path::new(PATH)).unwrap_err();
        assert!(matches!(err, PivotError::MalformedMigration { ref reason, .. } if reason.contains(DOWN_MARKER)));
    }

    #[test]
    fn test_missing_up_marker_is_malformed() {
        let err = MigrationScript::parse("DROP TABLE users;", Path::new(PATH)).unwrap_err();
        assert!(matches!(err, PivotError::MalformedMigration { .. }));
        assert!(err.to_string().contains(PATH));
    }

    #[test]
    fn test_checksum() {
        let sum = checksum("CREATE TABLE users (id INT);");
        assert_eq!(sum.len(), 64);
        assert_eq!(sum, checksum("CREATE TABLE users (id INT);"));
        assert_ne!(sum, checksum("CREATE TABLE posts (id INT);"));
    }

    #[test]
    fn test_split_simple_statements() {
        let stmts = split_sql_statements("SELECT 1; SELECT 2; SELECT 3;");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_split_ignores_semicolons_in_quotes() {
        let sql = "INSERT INTO t VALUES ('a;b', \"c;d\");\nALTER TABLE `we;ird` ADD x INT;";
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("'a;b'"));
        assert!(stmts[1].contains("`we;ird`"));
    }

    #[test]
    fn test_split_handles_escaped_quotes() {
        let stmts = split_sql_statements("SELECT 'it''s; fine'; SELECT 'a\\'b;c';");
        assert_eq!(stmts, vec!["SELECT 'it''s; fine'", "SELECT 'a\\'b;c'"]);
    }

    #[test]
    fn test_split_drops_comments() {
        let sql = "-- Irreversible: table legacy removed\n-- note; with semicolon\nDROP TABLE a; -- trailing\n";
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts, vec!["DROP TABLE a"]);
    }

    #[test]
    fn test_split_skips_block_and_hash_comments() {
        let sql = "/* setup; step one */ CREATE TABLE a (id INT);\n# note; here\nDROP TABLE b; /* tail; */";
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts, vec!["CREATE TABLE a (id INT)", "DROP TABLE b"]);
    }

    #[test]
    fn test_split_keeps_version_comments() {
        let stmts = split_sql_statements("CREATE TABLE a (id INT) /*!50100 ENGINE=InnoDB; */;");
        assert_eq!(stmts, vec!["CREATE TABLE a (id INT) /*!50100 ENGINE=InnoDB; */"]);
    }

    #[test]
    fn test_split_multiline_create() {
        let stmts = split_sql_statements("CREATE TABLE users (\nid INT NOT NULL,\nname VARCHAR NULL\n);\n");
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].starts_with("CREATE TABLE users ("));
    }
}
