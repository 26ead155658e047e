use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{
        cart::{CartEntry, CartLine},
        catalog::{CatalogParams, PriceBand},
        checkout::{OrderDetailInput, OrderDraft},
        money::Price,
    },
    dto::{
        analytics::{AnalyticsSnapshot, CategorySales, DailyEarning, ProductSales},
        cart::{AddToCartRequest, CartCleared, CartList, CartSummaryResponse},
        orders::{CheckoutRequest, CheckoutResult, OrderList},
        products::{
            CatalogPage, CreateProductForm, CreatedProduct, DeleteProductRequest, Pagination,
            ProductList, ProductsResponse,
        },
        users::{EmailAddress, ExternalProfile, UpsertUserRequest},
    },
    models::{CartItem, Order, Product, Seller, User},
    response::{ApiResponse, Meta},
    routes::{analytics, cart, health, orders, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        products::create_product,
        products::delete_product,
        cart::cart_list,
        cart::cart_summary,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        analytics::analytics,
        users::upsert_user
    ),
    components(
        schemas(
            User,
            Seller,
            Product,
            CartItem,
            Order,
            Price,
            PriceBand,
            CatalogParams,
            CartEntry,
            CartLine,
            OrderDetailInput,
            OrderDraft,
            CatalogPage,
            Pagination,
            ProductList,
            ProductsResponse,
            CreateProductForm,
            CreatedProduct,
            DeleteProductRequest,
            AddToCartRequest,
            CartList,
            CartSummaryResponse,
            CartCleared,
            CheckoutRequest,
            CheckoutResult,
            OrderList,
            AnalyticsSnapshot,
            DailyEarning,
            ProductSales,
            CategorySales,
            ExternalProfile,
            EmailAddress,
            UpsertUserRequest,
            Meta,
            ApiResponse<ProductsResponse>,
            ApiResponse<CheckoutResult>,
            ApiResponse<AnalyticsSnapshot>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog and seller listings"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Analytics", description = "Seller dashboard rollups"),
        (name = "Users", description = "First sign-in profile sync"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_api_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/products",
            "/api/products/{id}",
            "/api/cart",
            "/api/cart/summary",
            "/api/cart/clear",
            "/api/orders",
            "/api/analytics",
            "/api/user",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
