//! File categorization by extension.
//!
//! A [`CategoryTable`] is an ordered list of categories, each owning a set of
//! lowercase extensions (leading dot included). Lookups walk the table in
//! order and the first category containing the extension wins; anything
//! unmatched lands in [`OTHERS`].
//!
//! # Examples
//!
//! ```
//! use sortify::file_category::CategoryTable;
//!
//! let table = CategoryTable::default();
//! assert_eq!(table.classify("report.pdf"), "PDFs");
//! assert_eq!(table.classify("PHOTO.JPG"), "Images");
//! assert_eq!(table.classify("README"), "Others");
//! ```

/// Category used for every extension the table does not know.
pub const OTHERS: &str = "Others";

/// A named group of extensions sharing one destination folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    extensions: Vec<String>,
}

impl Category {
    /// Creates a category, normalising every extension to lowercase with a leading dot.
    pub fn new<I, S>(name: &str, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.to_string(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    /// The destination folder name for this category.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn contains(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }
}

/// Ordered, immutable mapping from category name to extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Builds a table from categories in lookup order.
    ///
    /// Overlapping extensions are accepted; the earlier category wins.
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Maps a filename to its category name.
    ///
    /// Only the final suffix is significant and the comparison is
    /// case-insensitive. Total over any input.
    ///
    /// # Examples
    ///
    /// ```
    /// use sortify::file_category::CategoryTable;
    ///
    /// let table = CategoryTable::default();
    /// assert_eq!(table.classify("backup.tar.gz"), "Archives");
    /// assert_eq!(table.classify(".bashrc"), "Others");
    /// ```
    pub fn classify(&self, file_name: &str) -> &str {
        let (_, ext) = split_extension(file_name);
        let ext = ext.to_lowercase();

        self.categories
            .iter()
            .find(|category| category.contains(&ext))
            .map(|category| category.name())
            .unwrap_or(OTHERS)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(vec![
            Category::new("PDFs", [".pdf"]),
            Category::new("Images", [".png", ".jpeg", ".jpg", ".gif"]),
            Category::new("TextFiles", [".txt", ".md"]),
            Category::new("Archives", [".zip", ".rar", ".tar", ".gz"]),
            Category::new("Code", [".py", ".js", ".java", ".cpp", ".html", ".css"]),
        ])
    }
}

/// Splits a filename into `(stem, extension)`, the extension keeping its dot.
///
/// Leading dots never start an extension, so `.bashrc` has none, while
/// `file.` has the extension `"."`.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    let leading_dots = file_name.len() - file_name.trim_start_matches('.').len();

    match file_name.rfind('.') {
        Some(idx) if idx > leading_dots => (&file_name[..idx], &file_name[idx..]),
        _ => (file_name, ""),
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}
