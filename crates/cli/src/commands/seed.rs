//! Seed the database with a small demo catalog.
//!
//! Products are inserted unconditionally; running the command twice yields
//! duplicates with fresh ids.

use rust_decimal::Decimal;

use pacande_storefront::db::{PgProductRepository, ProductStore};
use pacande_storefront::models::ProductDraft;

use super::{CliError, connect};

/// `(name, description, price, category, subcategory)`
const DEMO_PRODUCTS: &[(&str, &str, i64, &str, &str)] = &[
    (
        "Balón de fútbol",
        "Balón tamaño 5 cosido a mano",
        85_000,
        "Deporte",
        "Fútbol",
    ),
    (
        "Guantes de boxeo",
        "Guantes de 12 oz en cuero sintético",
        120_000,
        "Deporte",
        "Boxeo",
    ),
    (
        "Juego de sábanas",
        "Sábanas doble en algodón",
        99_900,
        "Hogar",
        "Alcoba",
    ),
    (
        "Set de ollas",
        "Cinco piezas antiadherentes",
        240_000,
        "Hogar",
        "Cocina",
    ),
    (
        "Conjunto deportivo infantil",
        "Sudadera y camiseta talla 8",
        65_000,
        "Ropa niño",
        "Conjuntos",
    ),
    (
        "Termo",
        "Termo de acero de 1 litro",
        40_000,
        "Variedad",
        "Accesorios",
    ),
];

/// Insert the demo catalog.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or an insert fails.
pub async fn products() -> Result<(), CliError> {
    let pool = connect().await?;
    let products = PgProductRepository::new(pool);

    for &(name, description, price, category, subcategory) in DEMO_PRODUCTS {
        let product = products
            .create(ProductDraft {
                name: name.to_owned(),
                description: description.to_owned(),
                price: Decimal::from(price),
                category: category.to_owned(),
                subcategory: Some(subcategory.to_owned()),
                image_url: None,
                discount: None,
            })
            .await?;
        tracing::info!(product_id = %product.id, name, "Product seeded");
    }

    tracing::info!(count = DEMO_PRODUCTS.len(), "Demo catalog seeded");
    Ok(())
}
