use crate::models::db_operations::posts_db_operations::DbError;
use thiserror::Error;

pub mod admin_helpers;
pub mod form_helpers;
pub mod public_helpers;
pub mod template_helpers;

#[derive(Error, Debug)]
pub enum HelperError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Redb Database error: {0}")]
    RedbDatabase(#[from] DbError),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}
