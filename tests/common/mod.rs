#![allow(dead_code)]

use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use tokio::sync::{Mutex, MutexGuard};

use sellbetter_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, ProductStatus},
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    state::AppState,
};

static DATABASE: Mutex<()> = Mutex::const_new(());

/// Flow tests in one binary share a database; hold this for the whole test.
pub async fn exclusive_database() -> MutexGuard<'static, ()> {
    DATABASE.lock().await
}

/// Database for flow tests, `None` when the environment does not provide one.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(&pool);
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payment_claims, email_outbox, audit_logs, orders, cart, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState::new(
        pool,
        orm,
        AppConfig::for_tests(database_url, "flow-test-secret"),
    ))
}

pub async fn create_user(state: &AppState, id: &str, email: &str) -> anyhow::Result<AuthUser> {
    UserActive {
        id: Set(id.to_string()),
        name: Set(format!("User {id}")),
        email: Set(email.to_string()),
        image: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: id.to_string(),
        email: Some(email.to_string()),
    })
}

pub async fn create_product(
    state: &AppState,
    seller: &AuthUser,
    title: &str,
    category: &str,
    price: Decimal,
    original_price: Decimal,
) -> anyhow::Result<i32> {
    let slug = title.to_lowercase().replace(' ', "-");
    let product = ProductActive {
        id: NotSet,
        title: Set(title.to_string()),
        price: Set(price),
        original_price: Set(original_price),
        description: Set(format!("{title} description")),
        about: Set(None),
        category: Set(category.to_string()),
        image_url: Set(format!("https://img.example/{slug}.png")),
        image_public_id: Set(None),
        product_url: Set(format!("https://files.example/{slug}.zip")),
        file_public_id: Set(None),
        message: Set(None),
        status: Set(ProductStatus::Active),
        deleted_at: Set(None),
        created_by: Set(seller.user_id.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}
