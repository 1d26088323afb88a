//! Which cached pages a product change invalidates.

use std::collections::BTreeSet;

pub const SHOP_PATH: &str = "/shop";
pub const PRODUCTS_PATH: &str = "/products";

/// Ordered list of cache keys to drop after a product change.
///
/// Covers the shop page, one page per configured category slug and the
/// product listing. Product detail pages (`/products/<slug>`) are not listed
/// and expire on their own TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevalidationPlan {
    paths: Vec<String>,
    category_slugs: Vec<String>,
}

impl RevalidationPlan {
    #[must_use]
    pub fn for_categories(category_slugs: &[String]) -> Self {
        let mut paths = Vec::with_capacity(category_slugs.len() + 2);
        paths.push(SHOP_PATH.to_string());
        paths.extend(category_slugs.iter().map(|slug| category_path(slug)));
        paths.push(PRODUCTS_PATH.to_string());
        Self {
            paths,
            category_slugs: category_slugs.to_vec(),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Catalog category slugs that this plan does not revalidate.
    ///
    /// Returned sorted and de-duplicated.
    #[must_use]
    pub fn uncovered_categories<'a, I>(&self, catalog_slugs: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        catalog_slugs
            .into_iter()
            .filter(|slug| {
                !slug.is_empty() && !self.category_slugs.iter().any(|c| c.as_str() == *slug)
            })
            .map(ToOwned::to_owned)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[must_use]
pub fn category_path(slug: &str) -> String {
    format!("/categories/{slug}")
}

#[must_use]
pub fn product_path(slug: &str) -> String {
    format!("{PRODUCTS_PATH}/{slug}")
}

#[cfg(test)]
mod tests {
    use labsync_core::DEFAULT_REVALIDATE_CATEGORIES;

    use super::*;

    fn default_slugs() -> Vec<String> {
        DEFAULT_REVALIDATE_CATEGORIES
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn plan_lists_shop_categories_then_products() {
        let plan = RevalidationPlan::for_categories(&default_slugs());
        let paths = plan.paths();

        assert_eq!(paths.len(), 9);
        assert_eq!(paths[0], "/shop");
        assert_eq!(paths[1], "/categories/beauty-anti-aging-antioxidant");
        assert_eq!(paths[8], "/products");
    }

    #[test]
    fn plan_never_includes_detail_pages() {
        let plan = RevalidationPlan::for_categories(&default_slugs());
        assert!(!plan
            .paths()
            .iter()
            .any(|p| p.starts_with("/products/")));
    }

    #[test]
    fn uncovered_categories_are_reported_once() {
        let plan = RevalidationPlan::for_categories(&["peptides".to_string()]);
        let missing =
            plan.uncovered_categories(["peptides", "blends", "blends", "", "accessories"]);
        assert_eq!(missing, vec!["accessories", "blends"]);
    }

    #[test]
    fn product_path_joins_slug() {
        assert_eq!(product_path("bpc-157"), "/products/bpc-157");
    }
}
