use std::collections::BTreeSet;

use crate::qualify::{self, QualifiedPathTrim};
use crate::types::{Declaration, SourceUnit};

/// Accumulates one file's declarations during traversal.
///
/// Sets collapse duplicates as they are added, so the repeated capture
/// passes of the traversal never inflate the result.
#[derive(Debug, Default)]
pub struct UnitBuilder {
    package: Option<String>,
    imports: BTreeSet<String>,
    exports: BTreeSet<String>,
    /// Insertion-ordered, unique.
    class_names: Vec<String>,
    property_declarations: BTreeSet<String>,
    functions: Vec<Declaration>,
}

impl UnitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_package(&mut self, package: impl Into<String>) {
        self.package = Some(package.into());
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn add_import(&mut self, import: impl Into<String>) {
        let import = import.into();
        if !import.is_empty() {
            self.imports.insert(import);
        }
    }

    pub fn add_export(&mut self, export: impl Into<String>) {
        self.exports.insert(export.into());
    }

    pub fn add_class_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() && !self.class_names.contains(&name) {
            self.class_names.push(name);
        }
    }

    pub fn add_property(&mut self, declaration: impl Into<String>) {
        let declaration = declaration.into();
        if !declaration.is_empty() {
            self.property_declarations.insert(declaration);
        }
    }

    pub fn has_functions(&self) -> bool {
        !self.functions.is_empty()
    }

    pub fn has_class_names(&self) -> bool {
        !self.class_names.is_empty()
    }

    /// Class names seen so far, space separated.
    pub fn class_names_joined(&self) -> String {
        self.class_names.join(" ")
    }

    /// Add a function unless one with the same name, return type and
    /// parameters exists. Returns the index of the stored declaration.
    pub fn add_function(&mut self, declaration: Declaration) -> Option<usize> {
        if self
            .functions
            .iter()
            .any(|f| f.same_signature(&declaration))
        {
            return None;
        }
        self.functions.push(declaration);
        Some(self.functions.len() - 1)
    }

    /// Add a function unless one with the same name already exists.
    pub fn add_function_by_name(&mut self, declaration: Declaration) -> Option<usize> {
        if self.functions.iter().any(|f| f.name == declaration.name) {
            return None;
        }
        self.add_function(declaration)
    }

    /// Attach an annotation to a stored function.
    pub fn annotate(&mut self, index: usize, annotation: impl Into<String>) {
        if let Some(function) = self.functions.get_mut(index) {
            function.annotations.push(annotation.into());
        }
    }

    /// Finish the unit, deriving its qualified exports from the package.
    pub fn finish(self, file_path: impl Into<String>, trim: QualifiedPathTrim) -> SourceUnit {
        let qualified_exports = match self.package.as_deref() {
            Some(package) => qualify::derive_qualified_exports(
                package,
                self.class_names.iter().map(String::as_str),
                self.functions.iter().map(|f| f.name.as_str()),
                self.property_declarations.iter().map(String::as_str),
                trim,
            ),
            None => Default::default(),
        };

        SourceUnit {
            file_path: file_path.into(),
            class_names: self.class_names.into_iter().collect(),
            imports: self.imports,
            exports: self.exports,
            qualified_exports,
            package: self.package,
            property_declarations: self.property_declarations,
            functions: self.functions,
        }
    }
}
