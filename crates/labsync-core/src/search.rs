//! Universal search over products and articles.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::articles::{Article, GeneratedArticle};
use crate::catalog::ProductGroup;

/// Queries shorter than this (after trimming) return nothing.
pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_RESULTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchHit {
    Product {
        slug: String,
        title: String,
        category: String,
        min_price: Decimal,
        image_url: Option<String>,
    },
    Article {
        slug: String,
        title: String,
        category: String,
        excerpt: String,
        generated: bool,
    },
}

impl SearchHit {
    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            Self::Product { slug, .. } | Self::Article { slug, .. } => slug,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Product { title, .. } | Self::Article { title, .. } => title,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub hits: Vec<SearchHit>,
    /// Number of matches before truncation to [`MAX_RESULTS`].
    pub total: usize,
}

/// Search the catalog and both article sources.
///
/// Products rank before articles; within each kind title matches rank
/// before body matches. Generated articles whose slug is already taken by a
/// hand-authored article are skipped.
#[must_use]
pub fn search(
    query: &str,
    groups: &[ProductGroup],
    articles: &[Article],
    generated: &[GeneratedArticle],
) -> SearchResults {
    let needle = query.trim().to_lowercase();
    if needle.chars().count() < MIN_QUERY_LEN {
        return SearchResults {
            query: needle,
            ..SearchResults::default()
        };
    }

    // (kind rank, title miss, hit); stable sort keeps source order otherwise.
    let mut ranked: Vec<(u8, bool, SearchHit)> = Vec::new();

    for group in groups {
        if group.searchable_text().contains(&needle) {
            ranked.push((
                0,
                !group.base_name.to_lowercase().contains(&needle),
                SearchHit::Product {
                    slug: group.slug.clone(),
                    title: group.base_name.clone(),
                    category: group.category.clone(),
                    min_price: group.min_price,
                    image_url: group.image_url.clone(),
                },
            ));
        }
    }

    let authored: HashSet<&str> = articles.iter().map(|a| a.slug.as_str()).collect();

    for article in articles {
        if article.searchable_text().contains(&needle) {
            ranked.push((
                1,
                !article.title.to_lowercase().contains(&needle),
                SearchHit::Article {
                    slug: article.slug.clone(),
                    title: article.title.clone(),
                    category: article.category.clone(),
                    excerpt: article.description.clone(),
                    generated: false,
                },
            ));
        }
    }

    for article in generated {
        if authored.contains(article.slug.as_str()) {
            continue;
        }
        if article.searchable_text().contains(&needle) {
            ranked.push((
                1,
                !article.title.to_lowercase().contains(&needle),
                SearchHit::Article {
                    slug: article.slug.clone(),
                    title: article.title.clone(),
                    category: article.category.clone(),
                    excerpt: article.meta_description.clone(),
                    generated: true,
                },
            ));
        }
    }

    ranked.sort_by_key(|(kind, title_miss, _)| (*kind, *title_miss));
    let total = ranked.len();
    let hits = ranked
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(_, _, hit)| hit)
        .collect();

    SearchResults {
        query: needle,
        hits,
        total,
    }
}
