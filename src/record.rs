#![forbid(unsafe_code)]

//! Flat per-video rows written to both the CSV export and the SQLite table.

use std::collections::HashMap;

/// Column names in output order. Shared by the CSV header and the table DDL.
pub const COLUMNS: [&str; 13] = [
    "video_id",
    "title",
    "description",
    "tags",
    "published_at",
    "channel_id",
    "channel_title",
    "category_id",
    "duration",
    "definition",
    "viewCount",
    "likeCount",
    "commentCount",
];

/// One row per video.
///
/// `like_count` and `comment_count` stay `None` when the creator hides the
/// metric; that is not the same as a count of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// JSON array text, `"[]"` for untagged videos.
    pub tags: String,
    pub published_at: Option<String>,
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    pub category_id: Option<String>,
    pub duration: Option<String>,
    pub definition: Option<String>,
    pub view_count: i64,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
}

/// A single cell, before it is rendered for a particular sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    Text(&'a str),
    Integer(i64),
    Null,
}

impl<'a> From<Option<&'a str>> for Field<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(Field::Null, Field::Text)
    }
}

impl From<Option<i64>> for Field<'_> {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Field::Null, Field::Integer)
    }
}

impl VideoRecord {
    /// Cells in `COLUMNS` order.
    pub fn fields(&self) -> [Field<'_>; 13] {
        [
            Field::Text(&self.video_id),
            self.title.as_deref().into(),
            self.description.as_deref().into(),
            Field::Text(&self.tags),
            self.published_at.as_deref().into(),
            self.channel_id.as_deref().into(),
            self.channel_title.as_deref().into(),
            self.category_id.as_deref().into(),
            self.duration.as_deref().into(),
            self.definition.as_deref().into(),
            Field::Integer(self.view_count),
            self.like_count.into(),
            self.comment_count.into(),
        ]
    }
}

/// Collapses rows sharing a `video_id`.
///
/// The last copy seen wins, since it is the most recently fetched snapshot,
/// but it takes the slot where the id first appeared so the output order is
/// stable across reruns with overlapping queries.
pub fn dedupe_last_wins(rows: Vec<VideoRecord>) -> Vec<VideoRecord> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    let mut unique: Vec<VideoRecord> = Vec::with_capacity(rows.len());
    for row in rows {
        match positions.get(&row.video_id) {
            Some(&index) => unique[index] = row,
            None => {
                positions.insert(row.video_id.clone(), unique.len());
                unique.push(row);
            }
        }
    }
    unique
}
