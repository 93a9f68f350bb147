//! Database models - structs representing the entity tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// One entry in the profile's ordered social-links list. `id` must be
/// unique within the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub id: String,
    pub platform: String,
    pub url: String,
    #[serde(default)]
    pub icon: String,
}

/// Profile row. One row per owning user id; upserted, never hard-deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub name: String,
    pub title: String,
    pub bio: String,
    pub avatar_url: String,
    pub avatar_path: String,
    pub skills: Json<Vec<String>>,
    pub social_links: Json<Vec<SocialLink>>,
    pub updated_at: DateTime<Utc>,
}

/// Project row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub image_path: String,
    pub link: String,
    pub technologies: Vec<String>,
    pub featured: bool,
    pub is_new_release: bool,
    pub is_update: bool,
    pub created_at: DateTime<Utc>,
}

/// Blog post row. `content` is sanitized rich HTML.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub image_url: String,
    pub image_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
