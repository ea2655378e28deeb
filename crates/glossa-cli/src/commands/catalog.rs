//! Catalog command implementation.

use crate::cli::{CatalogAction, CatalogArgs};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use glossa_schema::SchemaCatalog;
use std::path::Path;

/// Execute the catalog command.
pub async fn execute_catalog(args: CatalogArgs, formatter: &Formatter) -> Result<()> {
    match args.action {
        CatalogAction::Check { file } => {
            let catalog = SchemaCatalog::from_file(&file)?;
            println!("{}", check_report(&file, &catalog, formatter)?);
            Ok(())
        }
        CatalogAction::Show { file } => {
            let catalog = SchemaCatalog::from_file(&file)?;
            println!("{}", formatter.format_catalog(&catalog)?);
            Ok(())
        }
    }
}

/// Summary of a consistent catalog, or an error listing every issue.
pub fn check_report(file: &Path, catalog: &SchemaCatalog, formatter: &Formatter) -> Result<String> {
    let issues = catalog.issues();
    if issues.is_empty() {
        return Ok(formatter.success(&format!(
            "{}: {} table(s), {} glossary term(s), {} relationship(s)",
            file.display(),
            catalog.tables.len(),
            catalog.glossary.len(),
            catalog.relationships.len()
        )));
    }

    for issue in &issues {
        eprintln!("{}", formatter.error(issue));
    }
    Err(CliError::InvalidInput(format!(
        "{} has {} issue(s)",
        file.display(),
        issues.len()
    )))
}
