use super::*;

/// N tasks race to buy the last unit; exactly one commit wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_on_last_unit() {
    let manager = Arc::new(create_test_manager());
    seed_product(&manager, 1, "Croissant", 150, 1);

    let mut handles = Vec::new();
    for i in 0..8u64 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager
                .commit_order(&cart(&[(1, 1)]), &format!("pi_race_{}", i), i)
                .await
        }));
    }

    let mut wins = 0;
    let mut shortages = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(ManagerError::InsufficientStock(_)) => shortages += 1,
            Err(other) => panic!("Unexpected error: {:?}", other),
        }
    }

    assert_eq!(wins, 1, "Exactly one commit may claim the last unit");
    assert_eq!(shortages, 7);
    assert_eq!(stock_of(&manager, 1), 0);
}

/// Stock never goes negative under arbitrary interleavings.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stock_never_negative() {
    let manager = Arc::new(create_test_manager());
    seed_product(&manager, 1, "Baguette", 120, 5);

    let mut handles = Vec::new();
    for i in 0..10u64 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager
                .commit_order(&cart(&[(1, 2)]), &format!("pi_bulk_{}", i), i)
                .await
        }));
    }

    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 1;
        }
    }

    // 5 units, 2 per order: at most 2 commits can win
    assert_eq!(committed, 2);
    assert_eq!(stock_of(&manager, 1), 1);
}

/// Two racing transitions on the same order: exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_transitions_single_winner() {
    let manager = Arc::new(create_test_manager());
    seed_product(&manager, 1, "Croissant", 150, 10);
    let order = manager
        .commit_order(&cart(&[(1, 1)]), "pi_race_t", 1)
        .await
        .unwrap();

    let m1 = manager.clone();
    let m2 = manager.clone();
    let id = order.id;

    let ready = tokio::spawn(async move {
        m1.transition_status(id, OrderStatus::Ready, Some("12:00".to_string()))
            .await
    });
    let cancel =
        tokio::spawn(async move { m2.transition_status(id, OrderStatus::Cancelled, None).await });

    let results = [ready.await.unwrap().is_ok(), cancel.await.unwrap().is_ok()];
    let winners = results.iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "Exactly one racing transition may win");

    let stored = manager.get_order(id).unwrap();
    assert!(stored.status.is_terminal());
}
