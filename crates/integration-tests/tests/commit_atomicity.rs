//! Commit atomicity: concurrent checkouts and mid-commit rollback.

use std::sync::Arc;

use dragonfruit_core::{CustomerName, PhoneNumber, StoreCode, UserId};
use dragonfruit_shop::services::{CheckoutFields, CommitError, OrderService};
use dragonfruit_shop::store::ShopStore;

use dragonfruit_integration_tests::{FailingStore, TestContext};

fn fields() -> CheckoutFields {
    CheckoutFields {
        customer_name: CustomerName::parse("王小明").expect("name"),
        customer_phone: PhoneNumber::parse("0912345678").expect("phone"),
        store_code: StoreCode::parse("123456").expect("store"),
    }
}

#[tokio::test]
async fn test_concurrent_commits_never_oversell() {
    let ctx = TestContext::new();
    let product = ctx.seed_product("Last One", 100, 1).await;

    let alice = UserId::new(1);
    let bob = UserId::new(2);

    // Both carts hold the last unit; each add passed its own stock check.
    ctx.cart.add_item(alice, product.id, 1, &[]).await.expect("alice add");
    ctx.cart.add_item(bob, product.id, 1, &[]).await.expect("bob add");

    let orders = Arc::new(ctx.orders);
    let a = {
        let orders = orders.clone();
        tokio::spawn(async move { orders.commit(alice, fields()).await })
    };
    let b = {
        let orders = orders.clone();
        tokio::spawn(async move { orders.commit(bob, fields()).await })
    };
    let (a, b) = (a.await.expect("join"), b.await.expect("join"));

    // Exactly one commit wins; the loser sees a stock error and no order.
    let (winner, loser) = match (a, b) {
        (Ok(receipt), Err(e)) => ((alice, receipt), (bob, e)),
        (Err(e), Ok(receipt)) => ((bob, receipt), (alice, e)),
        (Ok(_), Ok(_)) => panic!("both commits succeeded on stock 1"),
        (Err(a), Err(b)) => panic!("both commits failed: {a} / {b}"),
    };

    assert!(matches!(
        loser.1,
        CommitError::CartChanged(_) | CommitError::StockConflict { .. }
    ));

    // Stock is exactly zero, never negative, and only the winner has an
    // order.
    let product = ctx.store.product(product.id).await.expect("read").expect("exists");
    assert_eq!(product.stock, 0);
    assert_eq!(
        ctx.store
            .orders_for_user(winner.0, 10)
            .await
            .expect("orders")
            .len(),
        1
    );
    assert!(
        ctx.store
            .orders_for_user(loser.0, 10)
            .await
            .expect("orders")
            .is_empty()
    );
    assert_eq!(winner.1.order.total.to_string(), "$100");
}

#[tokio::test]
async fn test_write_failure_rolls_back_reservation() {
    let ctx = TestContext::new();
    let product = ctx.seed_product("Oolong", 100, 5).await;
    let user = UserId::new(7);
    ctx.cart.add_item(user, product.id, 2, &[]).await.expect("add");

    // An order service whose store loses the order write mid-commit.
    let failing = Arc::new(FailingStore::new(ctx.store.clone()));
    let orders = OrderService::new(failing.clone(), ctx.notifier.clone(), &ctx.config);
    failing.fail_order_inserts();

    let err = orders.commit(user, fields()).await.expect_err("must fail");
    assert!(matches!(err, CommitError::Store(_)));
    assert!(err.user_message().contains("try again later"));

    // No partial effects: stock restored, cart intact, no order, no
    // operator broadcast.
    let product = ctx.store.product(product.id).await.expect("read").expect("exists");
    assert_eq!(product.stock, 5);
    assert_eq!(ctx.store.cart_lines(user).await.expect("lines").len(), 1);
    assert!(
        ctx.store
            .orders_for_user(user, 10)
            .await
            .expect("orders")
            .is_empty()
    );
    assert!(ctx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_commit_with_empty_cart_fails() {
    let ctx = TestContext::new();
    let err = ctx
        .orders
        .commit(UserId::new(9), fields())
        .await
        .expect_err("empty cart");
    assert!(matches!(err, CommitError::EmptyCart));
}
