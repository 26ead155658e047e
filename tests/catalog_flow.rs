mod common;

use rust_decimal::dec;

use sellbetter_api::{
    domain::catalog::{CatalogParams, CatalogQuery},
    services::{catalog_service, product_service},
};

use common::{create_product, create_user, database_url, setup_state};

fn params(limit: &str, page: &str, search: Option<&str>, categories: Option<&str>, sort: Option<&str>) -> CatalogParams {
    CatalogParams {
        limit: Some(limit.into()),
        page: Some(page.into()),
        search: search.map(str::to_string),
        categories: categories.map(str::to_string),
        sort: sort.map(str::to_string),
    }
}

#[tokio::test]
async fn catalog_paging_filters_and_search() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let seller = create_user(&state, "seller_1", "seller@example.com").await?;

    create_product(&state, &seller, "Budget Sheet", "Templates", dec!(8.00), dec!(8.00)).await?;
    create_product(&state, &seller, "Icon Pack", "Design", dec!(25.00), dec!(30.00)).await?;
    create_product(&state, &seller, "Rust Book", "E-books", dec!(49.00), dec!(49.00)).await?;
    create_product(&state, &seller, "Font Bundle", "Design", dec!(120.00), dec!(150.00)).await?;
    let hidden = create_product(&state, &seller, "100% Retro Icons", "Design", dec!(12.00), dec!(12.00)).await?;
    product_service::delete_product(&state, &seller, hidden).await?;

    // Deleted products never show up.
    let query = CatalogQuery::from_params(&params("2", "1", None, None, None));
    let page = catalog_service::list_catalog(&state, &query).await?.data.unwrap();
    assert_eq!(page.pagination.total, 4);
    assert_eq!(page.products.len(), 2);
    assert!(page.pagination.has_more);
    assert_eq!(page.products[0].title, "Font Bundle");
    assert!(page.products[0].seller.is_some());

    let query = CatalogQuery::from_params(&params("2", "2", None, None, None));
    let last = catalog_service::list_catalog(&state, &query).await?.data.unwrap();
    assert_eq!(last.products.len(), 2);
    assert!(!last.pagination.has_more);

    // Pages far past the end are empty, not an error.
    let query = CatalogQuery::from_params(&params("10", "9223372036854775807", None, None, None));
    let beyond = catalog_service::list_catalog(&state, &query).await?.data.unwrap();
    assert!(beyond.products.is_empty());
    assert_eq!(beyond.pagination.total, 4);
    assert!(!beyond.pagination.has_more);

    // Filters are OR-ed: any Design product or anything under $10.
    let query = CatalogQuery::from_params(&params("10", "1", None, Some("Design,Under $10"), Some("price_low_high")));
    let filtered = catalog_service::list_catalog(&state, &query).await?.data.unwrap();
    let titles: Vec<_> = filtered.products.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Budget Sheet", "Icon Pack", "Font Bundle"]);

    // Search is case-insensitive across title, description and category.
    let query = CatalogQuery::from_params(&params("10", "1", Some("rust"), None, None));
    let found = catalog_service::list_catalog(&state, &query).await?.data.unwrap();
    assert_eq!(found.products.len(), 1);
    assert_eq!(found.products[0].title, "Rust Book");

    // Search AND filters.
    let query = CatalogQuery::from_params(&params("10", "1", Some("pack"), Some("E-books"), None));
    let none = catalog_service::list_catalog(&state, &query).await?.data.unwrap();
    assert!(none.products.is_empty());
    assert_eq!(none.pagination.total, 0);

    // A percent sign is matched literally, only the deleted product has one.
    let query = CatalogQuery::from_params(&params("10", "1", Some("%"), None, None));
    let literal = catalog_service::list_catalog(&state, &query).await?.data.unwrap();
    assert!(literal.products.is_empty());

    Ok(())
}
