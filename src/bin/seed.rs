use rust_decimal::{Decimal, dec};
use sellbetter_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    middleware::auth::issue_token,
};

const SELLER_ID: &str = "seed_seller";
const BUYER_ID: &str = "seed_buyer";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&create_orm_conn(&pool)).await?;

    let seller_id = ensure_user(&pool, SELLER_ID, "Demo Seller", "seller@example.com").await?;
    let buyer_id = ensure_user(&pool, BUYER_ID, "Demo Buyer", "buyer@example.com").await?;
    seed_products(&pool, &seller_id).await?;

    let ttl = chrono::Duration::days(7);
    let seller_token = issue_token(&config.jwt_secret, &seller_id, Some("seller@example.com"), ttl)?;
    let buyer_token = issue_token(&config.jwt_secret, &buyer_id, Some("buyer@example.com"), ttl)?;

    println!("Seed completed. Seller ID: {seller_id}, Buyer ID: {buyer_id}");
    println!("Seller token: {seller_token}");
    println!("Buyer token: {buyer_token}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    id: &str,
    name: &str,
    email: &str,
) -> anyhow::Result<String> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .execute(pool)
    .await?;

    // The email may already belong to a user with another id.
    let existing: (String,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;

    println!("Ensured user {email}");
    Ok(existing.0)
}

async fn seed_products(pool: &sqlx::PgPool, seller_id: &str) -> anyhow::Result<()> {
    let products: [(&str, Decimal, Decimal, &str, &str); 5] = [
        ("Notion Budget Template", dec!(9.00), dec!(15.00), "Templates", "Track spending by month"),
        ("Lightroom Preset Pack", dec!(24.99), dec!(24.99), "Photography", "Twelve film-look presets"),
        ("Rust Async Handbook", dec!(49.00), dec!(79.00), "E-books", "Async Rust from futures to runtimes"),
        ("UI Icon Set", dec!(75.00), dec!(90.00), "Design", "600 line icons in SVG and Figma"),
        ("Indie SaaS Starter Kit", dec!(149.00), dec!(199.00), "Software", "Auth, billing and dashboards"),
    ];

    for (title, price, original_price, category, description) in products {
        let slug = title.to_lowercase().replace(' ', "-");
        sqlx::query(
            r#"
            INSERT INTO products
                (title, price, original_price, description, category, image_url, product_url, created_by)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE title = $1 AND created_by = $8)
            "#,
        )
        .bind(title)
        .bind(price)
        .bind(original_price)
        .bind(description)
        .bind(category)
        .bind(format!("https://placehold.co/600x400?text={slug}"))
        .bind(format!("https://files.example.com/{slug}.zip"))
        .bind(seller_id)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
