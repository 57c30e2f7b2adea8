//! Filtered, sorted and paginated views over a product list.
//!
//! These are pure functions over a snapshot; nothing here is stored.

use model::Product;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Default number of products per page
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Price ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceSort {
    #[default]
    PriceAsc,
    PriceDesc,
}

impl PriceSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSort::PriceAsc => "price-asc",
            PriceSort::PriceDesc => "price-desc",
        }
    }
}

impl fmt::Display for PriceSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price-asc" | "asc" => Ok(PriceSort::PriceAsc),
            "price-desc" | "desc" => Ok(PriceSort::PriceDesc),
            other => Err(format!("Unknown sort order: {}", other)),
        }
    }
}

/// What to show from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive substring of the product name; empty matches all
    pub search: String,
    /// Exact category; `None` matches all
    pub category: Option<String>,
    pub sort: PriceSort,
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            sort: PriceSort::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_sort(mut self, sort: PriceSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Check whether a product passes the search and category filters
    pub fn matches(&self, product: &Product) -> bool {
        let search = self.search.trim().to_lowercase();
        if !search.is_empty() && !product.name.to_lowercase().contains(&search) {
            return false;
        }
        match &self.category {
            Some(category) => &product.category == category,
            None => true,
        }
    }

    /// Filter, sort and paginate `products`
    pub fn apply(&self, products: &[Product]) -> ProductPage {
        let mut matching: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();

        // Stable, so equal prices keep catalog order.
        match self.sort {
            PriceSort::PriceAsc => matching.sort_by_key(|p| p.price),
            PriceSort::PriceDesc => matching.sort_by(|a, b| b.price.cmp(&a.price)),
        }

        let page_size = self.page_size.max(1);
        let page = self.page.max(1);
        let total_items = matching.len();
        let total_pages = total_items.div_ceil(page_size);

        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();

        ProductPage {
            items,
            page,
            total_pages,
            total_items,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: usize,
    pub total_pages: usize,
    /// Matching products across all pages
    pub total_items: usize,
}

impl ProductPage {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Unique categories in first-seen order
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen = HashSet::new();
    products
        .iter()
        .filter(|p| seen.insert(p.category.as_str()))
        .map(|p| p.category.clone())
        .collect()
}
