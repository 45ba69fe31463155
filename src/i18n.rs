//! Translation lookup
//!
//! User-facing strings are addressed by dotted keys such as
//! `table.column.lastColumn`. The engine never hard-codes a language: it
//! asks an injected [`Translator`], which wraps any lookup function. A
//! [`Catalog`] loaded from TOML is one way to build such a function:
//!
//! ```toml
//! [table.column]
//! lastColumn = "A table needs at least one column"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// English messages for every key the controller emits.
const ENGLISH: &str = r#"
[table.load]
failed = "Could not load table {table}: {error}"
created = "Created table {table}"

[table.row]
added = "Row added"
addFailed = "Could not add row: {error}"
deleted = "Row deleted"
deleteFailed = "Could not delete row {row}: {error}"
notFound = "Row {row} does not exist"

[table.cell]
saveFailed = "Could not save cell: {error}"

[table.column]
untitled = "New column"
added = "Column added"
addFailed = "Could not add column: {error}"
deleted = "Column {column} deleted"
deleteFailed = "Could not delete column {column}: {error}"
lastColumn = "A table needs at least one column"
notFound = "Column {column} does not exist"
emptyLabel = "Column name cannot be empty"
renameFailed = "Could not rename column: {error}"
resizeFailed = "Could not resize column: {error}"
typeChanged = "Column {column} updated"
typeChangeFailed = "Could not update column {column}: {error}"

[table.option]
empty = "Option name cannot be empty"
duplicate = "Option {option} already exists"
notFound = "Option {option} does not exist"

[table.dialog]
notOpen = "No column is being edited"

[table.state]
notLoaded = "Table is not loaded yet"
"#;

/// Resolves translation keys through an injected lookup function.
///
/// Unknown keys resolve to the key itself so a missing translation is
/// visible but never fatal.
#[derive(Clone)]
pub struct Translator {
    lookup: Arc<Lookup>,
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator").finish()
    }
}

impl Translator {
    pub fn new<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    /// A translator that knows no keys and echoes them back.
    pub fn identity() -> Self {
        Self::new(|_| None)
    }

    /// Built-in English messages.
    pub fn english() -> Self {
        Catalog::english().into_translator()
    }

    pub fn translate(&self, key: &str) -> String {
        (self.lookup)(key).unwrap_or_else(|| key.to_string())
    }

    /// Translates `key` and substitutes `{name}` placeholders.
    ///
    /// ```rust
    /// use lynxky::Translator;
    ///
    /// let t = Translator::new(|key| match key {
    ///     "greet" => Some("Hello, {name}!".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(t.translate_with("greet", &[("name", "Ada")]), "Hello, Ada!");
    /// assert_eq!(t.translate("missing.key"), "missing.key");
    /// ```
    pub fn translate_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        args.iter().fold(self.translate(key), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::english()
    }
}

/// Flat dotted-key message catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    /// Parses a TOML catalog, flattening nested tables into dotted keys.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the text is not valid TOML
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| Error::Config(format!("Invalid catalog: {}", e)))?;
        let mut entries = HashMap::new();
        flatten("", &table, &mut entries);
        Ok(Self { entries })
    }

    /// Loads a TOML catalog from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read catalog {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// The built-in English catalog.
    pub fn english() -> Self {
        Self::from_toml_str(ENGLISH).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlays `other` on top of this catalog.
    pub fn merge(mut self, other: Catalog) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn into_translator(self) -> Translator {
        Translator::new(move |key| self.entries.get(key).cloned())
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::Table(inner) => flatten(&full, inner, out),
            toml::Value::String(s) => {
                out.insert(full, s.clone());
            }
            other => {
                out.insert(full, other.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_nested_keys() {
        let catalog = Catalog::from_toml_str(
            r#"
            [editor.slashMenu]
            navigate = "to navigate"
            [table]
            count = 3
            "#,
        )
        .unwrap();
        assert_eq!(catalog.get("editor.slashMenu.navigate"), Some("to navigate"));
        assert_eq!(catalog.get("table.count"), Some("3"));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Catalog::from_toml_str("[unclosed"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_english_covers_controller_keys() {
        let catalog = Catalog::english();
        for key in [
            "table.column.lastColumn",
            "table.column.untitled",
            "table.option.empty",
            "table.load.failed",
            "table.cell.saveFailed",
        ] {
            assert!(catalog.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_merge_overrides() {
        let german = Catalog::from_toml_str(r#"table.column.untitled = "Neue Spalte""#).unwrap();
        let translator = Catalog::english().merge(german).into_translator();
        assert_eq!(translator.translate("table.column.untitled"), "Neue Spalte");
        assert_eq!(translator.translate("table.row.added"), "Row added");
    }

    #[test]
    fn test_identity_echoes_key() {
        let t = Translator::identity();
        assert_eq!(
            t.translate_with("table.row.notFound", &[("row", "4")]),
            "table.row.notFound"
        );
    }
}
