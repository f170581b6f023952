//! Cache types for Store API catalog responses.

use crate::commerce::types::{
    Collection, CollectionPage, Product, ProductCategory, ProductPage, ProductQuery, Region,
};

/// Cache key for catalog reads.
///
/// Product keys include the region because prices are region-specific.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product {
        handle: String,
        region_id: Option<String>,
    },
    Products(ProductQuery),
    Collection(String),
    Collections {
        limit: u32,
        offset: u32,
    },
    Category(String),
    Categories,
    Regions,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
    Collection(Box<Collection>),
    Collections(CollectionPage),
    Category(Box<ProductCategory>),
    Categories(Vec<ProductCategory>),
    Regions(Vec<Region>),
}
