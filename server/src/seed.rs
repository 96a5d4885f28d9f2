// server/src/seed.rs

use cartflow::{Catalog, NewProduct, Product};
use tracing::info;

const DEMO_PRODUCTS: &[(&str, &str, i64, i32)] = &[
  ("Espresso Beans 1kg", "Dark roast, whole beans.", 2499, 40),
  ("Pour-Over Kettle", "Gooseneck, 1.2 l.", 4500, 12),
  ("Ceramic Dripper", "Size 02.", 1900, 25),
  ("Paper Filters (100)", "Size 02, unbleached.", 650, 200),
  ("Hand Grinder", "Conical steel burrs.", 8900, 5),
];

/// Inserts a small demo catalog. Runs on every start with `SEED_DB=true`, so
/// repeated starts add the products again.
pub async fn seed_catalog<C: Catalog>(catalog: &C) -> anyhow::Result<Vec<Product>> {
  let mut created = Vec::with_capacity(DEMO_PRODUCTS.len());
  for (name, description, price_cents, stock_quantity) in DEMO_PRODUCTS {
    let mut product = NewProduct::new(*name, *price_cents, *stock_quantity);
    product.description = Some((*description).to_string());
    let product = catalog.insert_product(product).await?;
    info!(product_id = %product.id, name = %product.name, "Seeded product.");
    created.push(product);
  }
  Ok(created)
}
