//! Post entities and presentation helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, format_description::FormatItem, macros::format_description};
use uuid::Uuid;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");

/// Longest auto-derived excerpt, in characters.
const EXCERPT_CHAR_LIMIT: usize = 160;

/// Categories the composer offers by default. Free-text categories are still
/// accepted; this set only seeds grouping and form choices.
pub const KNOWN_CATEGORIES: &[&str] = &["engineering", "design", "community", "release", "notes"];

/// A stored post. The id is assigned by the backing store on create and is
/// the sole key used for deletion; records are never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Posts belonging to one category, most recent first.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub posts: Vec<PostRecord>,
}

/// Group posts by category, sorting each group by date descending. Categories
/// are emitted in lexicographic order so grouped output is deterministic.
pub fn group_by_category(posts: &[PostRecord]) -> Vec<CategoryGroup> {
    let mut groups: BTreeMap<String, Vec<PostRecord>> = BTreeMap::new();
    for post in posts {
        groups
            .entry(post.category.clone())
            .or_default()
            .push(post.clone());
    }

    groups
        .into_iter()
        .map(|(category, mut posts)| {
            posts.sort_by(|a, b| b.date.cmp(&a.date));
            CategoryGroup { category, posts }
        })
        .collect()
}

/// Render a date the way the list view shows it, e.g. `March 1, 2024`.
/// Falls back to ISO output if the format ever fails to render.
pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Derive a short plain-text excerpt from post content.
///
/// Markup tags are stripped rather than parsed; the editor's HTML is opaque
/// to this service and the excerpt only needs to read cleanly in a list view.
pub fn derive_excerpt(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for ch in content.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= EXCERPT_CHAR_LIMIT {
        return collapsed;
    }

    let truncated: String = collapsed.chars().take(EXCERPT_CHAR_LIMIT).collect();
    match truncated.rfind(' ') {
        Some(cut) => format!("{}…", &truncated[..cut]),
        None => format!("{truncated}…"),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn post(category: &str, day: Date) -> PostRecord {
        PostRecord {
            id: Uuid::new_v4(),
            title: "Title".to_string(),
            slug: "title".to_string(),
            content: "Body".to_string(),
            category: category.to_string(),
            author: "ada".to_string(),
            date: day,
            excerpt: None,
            image: None,
        }
    }

    #[test]
    fn groups_by_category_with_recency_inside_groups() {
        let older = post("engineering", date!(2024 - 01 - 02));
        let newer = post("engineering", date!(2024 - 03 - 01));
        let other = post("design", date!(2024 - 02 - 01));

        let groups = group_by_category(&[older.clone(), newer.clone(), other.clone()]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "design");
        assert_eq!(groups[1].category, "engineering");
        assert_eq!(groups[1].posts[0].id, newer.id);
        assert_eq!(groups[1].posts[1].id, older.id);
    }

    #[test]
    fn excerpt_strips_markup_and_truncates_on_word_boundary() {
        let content = "<p>The quick brown fox</p> jumps over the lazy dog. ".repeat(10);
        let excerpt = derive_excerpt(&content);

        assert!(!excerpt.contains('<'));
        assert!(excerpt.ends_with('…'));
        assert!(excerpt.chars().count() <= 161);
    }

    #[test]
    fn short_content_is_used_whole() {
        assert_eq!(derive_excerpt("<p>Hello  there</p>"), "Hello there");
    }
}
