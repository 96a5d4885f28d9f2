// tests/concurrency_tests.rs
mod common;

use cartflow::{Backend, CartStore, MemoryStore, OrderError, OrderService, Requester};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEADLOCK_TIMEOUT: Duration = Duration::from_secs(10);

fn shared_orders(shop: &Shop) -> Arc<OrderService<MemoryStore>> {
  Arc::new(OrderService::new(shop.store.clone()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_competing_orders_never_oversell() {
  let shop = shop();
  let a = shop.product("A", 100, 5).await;
  let first = Uuid::new_v4();
  let second = Uuid::new_v4();
  shop.add(first, a.id, 4).await;
  shop.add(second, a.id, 4).await;

  let orders = shared_orders(&shop);
  let (r1, r2) = tokio::join!(
    tokio::spawn({
      let orders = orders.clone();
      async move { orders.create_order(first).await }
    }),
    tokio::spawn({
      let orders = orders.clone();
      async move { orders.create_order(second).await }
    }),
  );
  let results = [r1.unwrap(), r2.unwrap()];

  let successes = results.iter().filter(|r| r.is_ok()).count();
  assert_eq!(successes, 1);
  let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
  assert!(
    matches!(failure, OrderError::InsufficientStock { requested: 4, available: 1, .. }),
    "unexpected failure: {failure:?}"
  );
  assert_eq!(shop.stock_of(a.id).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_buyers_for_limited_stock() {
  let shop = shop();
  let a = shop.product("Limited", 250, 10).await;
  let buyers: Vec<Uuid> = (0..25).map(|_| Uuid::new_v4()).collect();
  for buyer in &buyers {
    shop.add(*buyer, a.id, 1).await;
  }

  let orders = shared_orders(&shop);
  let handles: Vec<_> = buyers
    .iter()
    .map(|buyer| {
      let orders = orders.clone();
      let buyer = *buyer;
      tokio::spawn(async move { orders.create_order(buyer).await })
    })
    .collect();

  let mut successes = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => successes += 1,
      Err(OrderError::InsufficientStock { available: 0, .. }) => {}
      Err(other) => panic!("unexpected error: {other:?}"),
    }
  }

  assert_eq!(successes, 10);
  assert_eq!(shop.stock_of(a.id).await, 0);
  let all = orders.list_orders(&Requester::admin(Uuid::new_v4())).await.unwrap();
  assert_eq!(all.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_carts_do_not_deadlock() {
  let shop = shop();
  let a = shop.product("A", 100, 1_000).await;
  let b = shop.product("B", 200, 1_000).await;
  let c = shop.product("C", 300, 1_000).await;

  let users: Vec<Uuid> = (0..40).map(|_| Uuid::new_v4()).collect();
  for (i, user) in users.iter().enumerate() {
    // Same products, added in different orders.
    let mut products = vec![a.id, b.id, c.id];
    products.rotate_left(i % 3);
    for product_id in products {
      shop.add(*user, product_id, 1).await;
    }
  }

  let orders = shared_orders(&shop);
  let handles: Vec<_> = users
    .iter()
    .map(|user| {
      let orders = orders.clone();
      let user = *user;
      tokio::spawn(async move { orders.create_order(user).await })
    })
    .collect();

  let all_done = tokio::time::timeout(DEADLOCK_TIMEOUT, async move {
    for handle in handles {
      let order = handle.await.unwrap().unwrap();
      assert_eq!(order.total_amount_cents, 600);
    }
  })
  .await;
  assert!(all_done.is_ok(), "order creation deadlocked");

  assert_eq!(shop.stock_of(a.id).await, 960);
  assert_eq!(shop.stock_of(b.id).await, 960);
  assert_eq!(shop.stock_of(c.id).await, 960);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_concurrent_orders_serialize() {
  let shop = shop();
  let user = Uuid::new_v4();
  let a = shop.product("A", 100, 50).await;
  shop.add(user, a.id, 3).await;

  let orders = shared_orders(&shop);
  let (r1, r2) = tokio::join!(
    tokio::spawn({
      let orders = orders.clone();
      async move { orders.create_order(user).await }
    }),
    tokio::spawn({
      let orders = orders.clone();
      async move { orders.create_order(user).await }
    }),
  );
  let results = [r1.unwrap(), r2.unwrap()];

  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  assert!(results
    .iter()
    .any(|r| matches!(r, Err(OrderError::EmptyCart { user_id }) if *user_id == user)));
  assert_eq!(shop.stock_of(a.id).await, 47);
  assert_eq!(orders.list_orders(&Requester::customer(user)).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cart_mutation_waits_for_cart_lock() {
  let shop = shop();
  let user = Uuid::new_v4();
  let a = shop.product("A", 100, 50).await;
  shop.add(user, a.id, 1).await;

  // Hold the user's cart lock the way an in-flight order does.
  let mut tx = shop.store.begin().await.unwrap();
  shop.store.get_cart_lines(&mut tx, user).await.unwrap();

  let carts = Arc::new(cartflow::CartService::new(shop.store.clone()));
  let pending = tokio::spawn({
    let carts = carts.clone();
    async move { carts.add_to_cart(user, a.id, 2).await }
  });

  tokio::time::sleep(Duration::from_millis(100)).await;
  assert!(!pending.is_finished(), "cart mutation bypassed the cart lock");

  shop.store.rollback(tx).await.unwrap();
  let line = tokio::time::timeout(Duration::from_secs(2), pending)
    .await
    .expect("cart lock released")
    .unwrap()
    .unwrap();
  assert_eq!(line.quantity, 3);
}
