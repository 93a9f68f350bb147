/**
 * Routes Module
 * API route handlers
 */

pub mod assets;
pub mod auth;
pub mod blog;
pub mod generate;
pub mod health;
pub mod profile;
pub mod projects;
pub mod screenshot;

use serde::{Deserialize, Serialize};

/// Success response (for delete/logout style endpoints)
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}
