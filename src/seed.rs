//! Synthetic raw data
//!
//! Generates the supermarket sample: four stores, six products and a day of
//! orders, laid out the way the pipeline expects the raw zone:
//!
//! ```text
//! stores/ref_data/stores.csv
//! products/ref_data/products.csv
//! orders/<YYYY-MM-DD>/orders.csv
//! ```
//!
//! Output is a pure function of the date, the order count and the seed.

use bytes::Bytes;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::schema::{ORDERS, PRODUCTS, REFERENCE_SEGMENT, STORES};
use crate::storage::{ObjectStore, StorageError, StorageResult};

/// Orders generated when no count is given
pub const DEFAULT_ORDER_COUNT: usize = 100;

/// First order number
const FIRST_ORDER: usize = 1000;

#[derive(Debug, Clone, Serialize)]
struct Store {
    store_id: &'static str,
    location: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct Product {
    product_id: &'static str,
    product_name: &'static str,
    category: &'static str,
    #[serde(serialize_with = "two_decimals")]
    price: f64,
}

#[derive(Debug, Clone, Serialize)]
struct Order {
    order_id: String,
    order_timestamp: String,
    store_id: &'static str,
    product_id: &'static str,
    quantity: u32,
    #[serde(serialize_with = "two_decimals")]
    unit_price: f64,
}

fn two_decimals<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.2}", value))
}

const STORE_HEADER: &[&str] = &["store_id", "location"];

const STORE_ROWS: &[Store] = &[
    Store {
        store_id: "S001",
        location: "New York - Downtown",
    },
    Store {
        store_id: "S002",
        location: "New York - Queens",
    },
    Store {
        store_id: "S003",
        location: "Los Angeles - Beverly Hills",
    },
    Store {
        store_id: "S004",
        location: "Chicago - Loop",
    },
];

const PRODUCT_HEADER: &[&str] = &["product_id", "product_name", "category", "price"];

const PRODUCT_ROWS: &[Product] = &[
    Product {
        product_id: "P001",
        product_name: "Apple",
        category: "Fruit",
        price: 0.50,
    },
    Product {
        product_id: "P002",
        product_name: "Banana",
        category: "Fruit",
        price: 0.30,
    },
    Product {
        product_id: "P003",
        product_name: "Milk",
        category: "Dairy",
        price: 3.50,
    },
    Product {
        product_id: "P004",
        product_name: "Bread",
        category: "Bakery",
        price: 2.50,
    },
    Product {
        product_id: "P005",
        product_name: "Eggs",
        category: "Dairy",
        price: 4.00,
    },
    Product {
        product_id: "P006",
        product_name: "Chicken Breast",
        category: "Meat",
        price: 9.00,
    },
];

const ORDER_HEADER: &[&str] = &[
    "order_id",
    "order_timestamp",
    "store_id",
    "product_id",
    "quantity",
    "unit_price",
];

/// One generated raw object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedObject {
    pub key: String,
    pub data: Bytes,
    pub rows: usize,
}

/// Raw key of a reference dataset's single object
pub fn reference_key(dataset: &str) -> String {
    format!("{}/{}/{}.csv", dataset, REFERENCE_SEGMENT, dataset)
}

/// Raw key of one day of orders
pub fn orders_key(date: NaiveDate) -> String {
    format!("{}/{}/{}.csv", ORDERS, date.format("%Y-%m-%d"), ORDERS)
}

/// Generate stores, products and `order_count` orders placed on `date`
pub fn generate(
    date: NaiveDate,
    order_count: usize,
    seed: u64,
) -> StorageResult<Vec<SeedObject>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();

    let mut orders = Vec::with_capacity(order_count);
    for i in 0..order_count {
        let (Some(store), Some(product)) =
            (STORE_ROWS.choose(&mut rng), PRODUCT_ROWS.choose(&mut rng))
        else {
            break;
        };
        let placed_at = midnight + Duration::seconds(rng.gen_range(0..86_400));
        orders.push(Order {
            order_id: format!("ORD-{}", FIRST_ORDER + i),
            order_timestamp: placed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            store_id: store.store_id,
            product_id: product.product_id,
            quantity: rng.gen_range(1..=5),
            unit_price: product.price,
        });
    }

    Ok(vec![
        SeedObject {
            key: reference_key(STORES),
            data: to_csv(STORE_HEADER, STORE_ROWS)?,
            rows: STORE_ROWS.len(),
        },
        SeedObject {
            key: reference_key(PRODUCTS),
            data: to_csv(PRODUCT_HEADER, PRODUCT_ROWS)?,
            rows: PRODUCT_ROWS.len(),
        },
        SeedObject {
            key: orders_key(date),
            data: to_csv(ORDER_HEADER, &orders)?,
            rows: orders.len(),
        },
    ])
}

/// Header first, so an object without rows still names its columns
fn to_csv<T: Serialize>(header: &[&str], rows: &[T]) -> StorageResult<Bytes> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|e| StorageError::Io(format!("Failed to encode seed header: {}", e)))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| StorageError::Io(format!("Failed to encode seed row: {}", e)))?;
    }
    writer
        .into_inner()
        .map(Bytes::from)
        .map_err(|e| StorageError::Io(format!("Failed to encode seed data: {}", e)))
}

/// Write generated objects to the raw zone, returning their keys
pub async fn upload(
    store: &dyn ObjectStore,
    objects: Vec<SeedObject>,
) -> StorageResult<Vec<String>> {
    let mut keys = Vec::with_capacity(objects.len());
    for object in objects {
        store.write(&object.key, object.data).await?;
        tracing::info!(
            zone = store.zone(),
            key = %object.key,
            rows = object.rows,
            "Uploaded seed object"
        );
        keys.push(object.key);
    }
    Ok(keys)
}
