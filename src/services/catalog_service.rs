use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::{
    domain::catalog::{CatalogFilter, CatalogQuery, CatalogSort, like_pattern},
    dto::products::{CatalogPage, Pagination},
    entity::products::{Column, Entity as Products, ProductStatus},
    entity::users::Entity as Users,
    error::AppResult,
    response::{ApiResponse, Meta},
    services::product_service::product_from_entity,
    state::AppState,
};

/// WHERE clause for a catalog query: active products, search AND any filter.
pub fn build_condition(query: &CatalogQuery) -> Condition {
    let mut condition = Condition::all().add(Column::Status.eq(ProductStatus::Active));

    if let Some(term) = &query.search {
        let pattern = like_pattern(term);
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Products, Column::Title)).ilike(pattern.clone()))
                .add(Expr::col((Products, Column::Description)).ilike(pattern.clone()))
                .add(Expr::col((Products, Column::Category)).ilike(pattern)),
        );
    }

    if !query.filters.is_empty() {
        let filters = query
            .filters
            .iter()
            .fold(Condition::any(), |any, filter| any.add(filter_condition(filter)));
        condition = condition.add(filters);
    }

    condition
}

fn filter_condition(filter: &CatalogFilter) -> Condition {
    match filter {
        CatalogFilter::Category(name) => Condition::all().add(Column::Category.eq(name.clone())),
        CatalogFilter::PriceRange(band) => {
            let (min, max) = band.bounds();
            let mut range = Condition::all();
            if let Some(min) = min {
                range = range.add(Column::Price.gte(min));
            }
            if let Some(max) = max {
                range = range.add(Column::Price.lte(max));
            }
            range
        }
    }
}

pub async fn list_catalog(
    state: &AppState,
    query: &CatalogQuery,
) -> AppResult<ApiResponse<CatalogPage>> {
    let condition = build_condition(query);

    let total = Products::find()
        .filter(condition.clone())
        .count(&state.orm)
        .await? as i64;

    let mut finder = Products::find().find_also_related(Users).filter(condition);
    finder = match query.sort {
        CatalogSort::PriceLowHigh => finder.order_by_asc(Column::Price),
        CatalogSort::PriceHighLow => finder.order_by_desc(Column::Price),
        CatalogSort::Newest | CatalogSort::Popular => finder.order_by_desc(Column::CreatedAt),
    };

    let products: Vec<_> = finder
        .order_by_desc(Column::Id)
        .limit(query.limit)
        .offset(query.offset())
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(product, seller)| product_from_entity(product, seller))
        .collect();

    let page = query.page as i64;
    let limit = query.limit as i64;
    let meta = Meta::new(page, limit, total, products.len());
    tracing::debug!(total, returned = products.len(), page, "catalog query");

    let data = CatalogPage {
        pagination: Pagination {
            total,
            page,
            limit,
            has_more: meta.has_more.unwrap_or(false),
        },
        products,
    };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}
