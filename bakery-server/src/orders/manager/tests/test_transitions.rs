use super::*;

async fn committed_order(manager: &OrdersManager, payment: &str, customer: u64) -> Order {
    manager
        .commit_order(&cart(&[(1, 1)]), payment, customer)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_ready_requires_pickup_time() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_t1", 1).await;

    let err = manager
        .transition_status(order.id, OrderStatus::Ready, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::PickupTimeRequired));

    // Order untouched
    let stored = manager.get_order(order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::InPreparation);
}

#[tokio::test]
async fn test_in_preparation_to_ready() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_t2", 1).await;

    let (updated, warning) = manager
        .transition_status(order.id, OrderStatus::Ready, Some("12:30".to_string()))
        .await
        .unwrap();

    assert_eq!(updated.status, OrderStatus::Ready);
    assert_eq!(updated.pickup_time.as_deref(), Some("12:30"));
    assert!(warning.is_none());
}

#[tokio::test]
async fn test_in_preparation_to_cancelled() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_t3", 1).await;

    let (updated, _) = manager
        .transition_status(order.id, OrderStatus::Cancelled, None)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_terminal_states_are_final() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);

    // READY admits nothing
    let order = committed_order(&manager, "pi_t4", 1).await;
    manager
        .transition_status(order.id, OrderStatus::Ready, Some("12:30".to_string()))
        .await
        .unwrap();
    for target in [
        OrderStatus::InPreparation,
        OrderStatus::Ready,
        OrderStatus::Cancelled,
    ] {
        let err = manager
            .transition_status(order.id, target, Some("13:00".to_string()))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ManagerError::IllegalTransition { .. }),
            "READY -> {} should be illegal",
            target
        );
    }

    // CANCELLED admits nothing
    let order = committed_order(&manager, "pi_t5", 1).await;
    manager
        .transition_status(order.id, OrderStatus::Cancelled, None)
        .await
        .unwrap();
    let err = manager
        .transition_status(order.id, OrderStatus::Ready, Some("13:00".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::IllegalTransition { .. }));
}

#[tokio::test]
async fn test_transition_unknown_order() {
    let manager = create_test_manager();
    let err = manager
        .transition_status(404, OrderStatus::Cancelled, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::OrderNotFound(404)));
}

#[tokio::test]
async fn test_cancel_broadcasts_cancelled_event() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_t6", 1).await;

    let mut rx = manager.subscribe();
    manager
        .transition_status(order.id, OrderStatus::Cancelled, None)
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event, shared::order::OrderEventKind::OrderCancelled);
    assert_eq!(event.order.id, order.id);
}

#[tokio::test]
async fn test_ready_broadcasts_updated_event() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_t7", 1).await;

    let mut rx = manager.subscribe();
    manager
        .transition_status(order.id, OrderStatus::Ready, Some("11:00".to_string()))
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event, shared::order::OrderEventKind::OrderUpdated);
}

#[tokio::test]
async fn test_notification_failure_surfaces_as_warning() {
    let sender = Arc::new(RecordingSender::failing());
    let manager = create_test_manager_with_sender(sender.clone());
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_t8", 1).await;

    let (updated, warning) = manager
        .transition_status(order.id, OrderStatus::Ready, Some("12:00".to_string()))
        .await
        .unwrap();

    // Transition stands; the failure is reported, not rolled back
    assert_eq!(updated.status, OrderStatus::Ready);
    assert!(warning.unwrap().contains("notification failed"));
    assert_eq!(
        manager.get_order(order.id).unwrap().status,
        OrderStatus::Ready
    );
}

// ========================================================================
// Soft delete
// ========================================================================

#[tokio::test]
async fn test_delete_requires_cancelled_status() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_d1", 1).await;

    let err = manager.delete_order(order.id, 1).unwrap_err();
    assert!(matches!(err, ManagerError::NotPermitted(_)));
}

#[tokio::test]
async fn test_delete_requires_ownership() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_d2", 1).await;
    manager
        .transition_status(order.id, OrderStatus::Cancelled, None)
        .await
        .unwrap();

    let err = manager.delete_order(order.id, 2).unwrap_err();
    assert!(matches!(err, ManagerError::NotPermitted(_)));
}

#[tokio::test]
async fn test_delete_hides_from_history_but_keeps_row() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_d3", 1).await;
    manager
        .transition_status(order.id, OrderStatus::Cancelled, None)
        .await
        .unwrap();

    manager.delete_order(order.id, 1).unwrap();

    // Gone from the customer's history
    assert!(manager.orders_for_customer(1).unwrap().is_empty());
    // Authoritative row survives
    let stored = manager.get_order(order.id).unwrap();
    assert!(stored.deleted);
    // Deleting twice changes nothing
    manager.delete_order(order.id, 1).unwrap();
    assert!(manager.orders_for_customer(1).unwrap().is_empty());
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);

    let a = committed_order(&manager, "pi_h1", 5).await;
    let b = committed_order(&manager, "pi_h2", 5).await;

    let history = manager.orders_for_customer(5).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, b.id);
    assert_eq!(history[1].id, a.id);
}

#[tokio::test]
async fn test_orders_for_date_includes_deleted() {
    let manager = create_test_manager();
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = committed_order(&manager, "pi_h3", 1).await;
    manager
        .transition_status(order.id, OrderStatus::Cancelled, None)
        .await
        .unwrap();
    manager.delete_order(order.id, 1).unwrap();

    // The admin date view still sees the soft-deleted row
    let today = chrono::Utc::now().date_naive();
    let orders = manager.orders_for_date(today).unwrap();
    assert_eq!(orders.len(), 1);
}
