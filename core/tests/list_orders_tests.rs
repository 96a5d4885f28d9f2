// tests/list_orders_tests.rs
mod common;

use cartflow::{OrderStatus, Requester};
use common::*;
use uuid::Uuid;

#[tokio::test]
async fn test_customer_sees_only_own_orders() {
  let shop = shop();
  let alice = Uuid::new_v4();
  let bob = Uuid::new_v4();
  let a = shop.product("A", 100, 50).await;

  shop.add(alice, a.id, 1).await;
  shop.orders.create_order(alice).await.unwrap();
  shop.add(bob, a.id, 2).await;
  shop.orders.create_order(bob).await.unwrap();

  let alices = shop.orders.list_orders(&Requester::customer(alice)).await.unwrap();
  assert_eq!(alices.len(), 1);
  assert!(alices.iter().all(|o| o.order.user_id == alice));

  let admin = Requester::admin(Uuid::new_v4());
  let everything = shop.orders.list_orders(&admin).await.unwrap();
  assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn test_orders_are_listed_newest_first_with_lines() {
  let shop = shop();
  let user = Uuid::new_v4();
  let a = shop.product("A", 100, 50).await;
  let b = shop.product("B", 250, 50).await;

  let mut created = Vec::new();
  for quantity in 1..=3 {
    shop.add(user, a.id, quantity).await;
    shop.add(user, b.id, 1).await;
    created.push(shop.orders.create_order(user).await.unwrap());
  }

  let listed = shop.orders.list_orders(&Requester::customer(user)).await.unwrap();

  let listed_ids: Vec<Uuid> = listed.iter().map(|o| o.order.id).collect();
  let expected: Vec<Uuid> = created.iter().rev().map(|o| o.id).collect();
  assert_eq!(listed_ids, expected);
  for window in listed.windows(2) {
    assert!(window[0].order.created_at >= window[1].order.created_at);
  }
  for details in &listed {
    assert_eq!(details.order.status, OrderStatus::Pending);
    assert_eq!(details.lines.len(), 2);
    assert!(details.lines.iter().all(|l| l.line.order_id == details.order.id));
    let sum: i64 = details.lines.iter().map(|l| l.line.subtotal_cents().unwrap()).sum();
    assert_eq!(sum, details.order.total_amount_cents);
  }
}

#[tokio::test]
async fn test_removed_product_keeps_line_without_snapshot() {
  let shop = shop();
  let user = Uuid::new_v4();
  let a = shop.product("A", 100, 50).await;
  shop.add(user, a.id, 2).await;
  shop.orders.create_order(user).await.unwrap();
  shop.store.remove_product(a.id);

  let listed = shop.orders.list_orders(&Requester::customer(user)).await.unwrap();

  let line = &listed[0].lines[0];
  assert_eq!(line.line.quantity, 2);
  assert_eq!(line.line.unit_price_cents, 100);
  assert!(line.product.is_none());
}

#[tokio::test]
async fn test_no_orders_lists_empty() {
  let shop = shop();
  let listed = shop.orders.list_orders(&Requester::customer(Uuid::new_v4())).await.unwrap();
  assert!(listed.is_empty());
}
