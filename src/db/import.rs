//! CSV seeding for the reference tables.
//!
//! Ingredients are read as `name,measurement_unit` and tags as
//! `name,color,slug`. Rows that already exist are left untouched, so an
//! import can be re-run safely.

use csv::{ReaderBuilder, Trim};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{de::DeserializeOwned, Deserialize};
use std::path::Path;
use tracing::{info, warn};

use crate::db::services::{get_or_create_ingredient, get_or_create_tag};
use crate::services::validation;
use crate::web::error::AppError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub existing: usize,
}

#[derive(Debug, Deserialize)]
struct IngredientRow {
    name: String,
    measurement_unit: String,
}

#[derive(Debug, Deserialize)]
struct TagRow {
    name: String,
    color: String,
    slug: String,
}

/// Reads headerless CSV rows, skipping `#` comment lines and blank records.
/// Each row comes back with its line number for error messages.
fn read_rows<T: DeserializeOwned>(
    contents: &str,
    shape: &str,
    field_count: usize,
) -> Result<Vec<(u64, T)>, String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("invalid CSV: {e}"))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        if record.len() != field_count {
            return Err(format!("line {line}: expected `{shape}`"));
        }
        let row = record
            .deserialize::<T>(None)
            .map_err(|e| format!("line {line}: {e}"))?;
        rows.push((line, row));
    }
    Ok(rows)
}

/// Parses `name,measurement_unit` rows. Names containing commas must be quoted.
pub fn parse_ingredients(contents: &str) -> Result<Vec<(String, String)>, String> {
    read_rows::<IngredientRow>(contents, "name,measurement_unit", 2)?
        .into_iter()
        .map(|(line, row)| {
            if row.name.is_empty() || row.measurement_unit.is_empty() {
                return Err(format!("line {line}: empty name or unit"));
            }
            Ok((row.name, row.measurement_unit))
        })
        .collect()
}

/// Parses `name,color,slug` rows.
pub fn parse_tags(contents: &str) -> Result<Vec<(String, String, String)>, String> {
    read_rows::<TagRow>(contents, "name,color,slug", 3)?
        .into_iter()
        .map(|(line, row)| {
            validation::validate_tag(&row.name, &row.color, &row.slug)
                .map_err(|e| format!("line {line}: {e}"))?;
            Ok((row.name, row.color, row.slug))
        })
        .collect()
}

async fn read_file(path: &Path) -> Result<String, AppError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::InternalServerError(format!("Failed to read {}: {e}", path.display()))
    })
}

pub async fn import_ingredients(
    pool: &DatabaseConnection,
    path: &Path,
) -> Result<ImportSummary, AppError> {
    let rows = parse_ingredients(&read_file(path).await?).map_err(AppError::InvalidInput)?;

    let txn = pool.begin().await?;
    let mut summary = ImportSummary::default();
    for (name, unit) in &rows {
        let (_, created) = get_or_create_ingredient(&txn, name, unit).await?;
        if created {
            summary.created += 1;
        } else {
            summary.existing += 1;
        }
    }
    txn.commit().await?;

    info!(file = %path.display(), created = summary.created, existing = summary.existing, "Imported ingredients.");
    Ok(summary)
}

pub async fn import_tags(pool: &DatabaseConnection, path: &Path) -> Result<ImportSummary, AppError> {
    let rows = parse_tags(&read_file(path).await?).map_err(AppError::InvalidInput)?;

    let txn = pool.begin().await?;
    let mut summary = ImportSummary::default();
    for (name, color, slug) in &rows {
        let (tag_model, created) = get_or_create_tag(&txn, name, color, slug).await?;
        if created {
            summary.created += 1;
        } else {
            if tag_model.color != *color || tag_model.name != *name {
                warn!(slug = %slug, "Tag already exists with different values; keeping the stored one.");
            }
            summary.existing += 1;
        }
    }
    txn.commit().await?;

    info!(file = %path.display(), created = summary.created, existing = summary.existing, "Imported tags.");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredients_handles_quotes_and_comments() {
        let rows =
            parse_ingredients("\"flour, wheat\",g\n\n# comment\nmilk, ml\n\"egg\",pcs\n").unwrap();
        assert_eq!(
            rows,
            vec![
                ("flour, wheat".to_string(), "g".to_string()),
                ("milk".to_string(), "ml".to_string()),
                ("egg".to_string(), "pcs".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_ingredients_rejects_missing_unit() {
        let err = parse_ingredients("flour\n").unwrap_err();
        assert!(err.starts_with("line 1"));
        let err = parse_ingredients("salt,g\nflour, wheat,g\n").unwrap_err();
        assert!(err.starts_with("line 2"));
    }

    #[test]
    fn test_parse_tags_checks_color() {
        let rows = parse_tags("Breakfast,#E26C2D,breakfast\n").unwrap();
        assert_eq!(rows[0].2, "breakfast");
        assert!(parse_tags("Lunch,green,lunch\n").is_err());
        assert!(parse_tags("Lunch,#49B64E\n").is_err());
    }

    #[test]
    fn test_parse_tags_unquotes_names() {
        let rows = parse_tags("\"Brunch, late\",#E26C2D,brunch\n").unwrap();
        assert_eq!(
            rows,
            vec![(
                "Brunch, late".to_string(),
                "#E26C2D".to_string(),
                "brunch".to_string()
            )]
        );
    }
}
