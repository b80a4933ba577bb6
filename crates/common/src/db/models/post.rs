//! Post entity

use crate::sentiment::SentimentLabel;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,

    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub community: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub author: String,

    pub score: i64,

    pub num_comments: i64,

    #[sea_orm(column_type = "Double")]
    pub upvote_ratio: f64,

    /// Kept from the first insert
    pub created_at: DateTimeUtc,

    #[sea_orm(column_type = "Double")]
    pub sentiment_score: f64,

    /// Stored lowercase, see `SentimentLabel::as_str`
    #[sea_orm(column_type = "Text")]
    pub sentiment_label: String,

    pub fetched_at: DateTimeUtc,
}

impl Model {
    /// Get the sentiment label as an enum
    pub fn label(&self) -> SentimentLabel {
        self.sentiment_label
            .parse()
            .unwrap_or_else(|_| SentimentLabel::from_score(self.sentiment_score))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
