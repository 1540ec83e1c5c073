//! 订单生命周期集成测试
//!
//! 使用内存存储和预设响应的积分计算系统，验证登记、对账、入账、提现的完整流程

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::watch;

use common::{ScriptedAccrual, dec, epoch, services, verdict};
use loyalty_service::accrual::{AccrualResponse, ManualClock, Reconciler};
use loyalty_service::error::LoyaltyError;
use loyalty_service::models::{AccrualStatus, Order, OrderStatus, SubmitOutcome, VerdictOutcome};
use loyalty_service::repository::{BalanceRepositoryTrait, OrderRepositoryTrait};

// ==================== 登记 ====================

#[tokio::test]
async fn test_submission_is_idempotent_per_owner() {
    let svc = services();

    assert_eq!(
        svc.orders.submit_order(1, "79927398713").await.unwrap(),
        SubmitOutcome::Accepted
    );
    assert_eq!(
        svc.orders.submit_order(1, "79927398713").await.unwrap(),
        SubmitOutcome::AlreadySubmitted
    );
    assert!(matches!(
        svc.orders.submit_order(2, "79927398713").await,
        Err(LoyaltyError::IdentifierConflict(_))
    ));

    let order = svc.store.find_order("79927398713").await.unwrap().unwrap();
    assert_eq!(order.user_id, 1);
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(svc.store.order_count(), 1);
}

#[tokio::test]
async fn test_invalid_numbers_are_not_persisted() {
    let svc = services();

    for number in ["79927398710", "12a", ""] {
        assert!(svc.orders.submit_order(1, number).await.is_err());
    }
    assert_eq!(svc.store.order_count(), 0);
}

#[tokio::test]
async fn test_concurrent_submissions_have_single_owner() {
    let svc = services();

    let handles: Vec<_> = (1..=8)
        .map(|user_id| {
            let orders = svc.orders.clone();
            tokio::spawn(async move { orders.submit_order(user_id, "12345678903").await })
        })
        .collect();

    let mut accepted = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(SubmitOutcome::Accepted) => accepted += 1,
            Err(LoyaltyError::IdentifierConflict(_)) => conflicts += 1,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(conflicts, 7);
}

// ==================== 对账与余额 ====================

#[tokio::test]
async fn test_processed_order_credit_then_withdraw() {
    let svc = services();
    svc.orders.submit_order(1, "12345678903").await.unwrap();

    let accrual = Arc::new(ScriptedAccrual::new());
    accrual.script(
        "12345678903",
        vec![
            verdict("12345678903", AccrualStatus::Registered, None),
            verdict("12345678903", AccrualStatus::Processing, None),
            verdict("12345678903", AccrualStatus::Processed, Some("500.50")),
        ],
    );

    let clock = Arc::new(ManualClock::new(epoch()));
    let mut reconciler = Reconciler::new(
        svc.orders.clone(),
        accrual.clone(),
        clock,
        Duration::from_secs(60),
    );
    let (_tx, shutdown) = watch::channel(false);

    // REGISTERED → PROCESSING
    let report = reconciler.run_tick(&shutdown).await;
    assert_eq!(report.applied, 1);
    let order = svc.store.find_order("12345678903").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Processing);

    // PROCESSING → 无变化
    let report = reconciler.run_tick(&shutdown).await;
    assert_eq!(report.unchanged, 1);

    // PROCESSED 500.50
    let report = reconciler.run_tick(&shutdown).await;
    assert_eq!(report.applied, 1);
    let order = svc.store.find_order("12345678903").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Processed);
    assert_eq!(order.accrual, dec("500.50"));

    // 终态订单不再被轮询
    let report = reconciler.run_tick(&shutdown).await;
    assert_eq!(report.pending, 0);
    assert_eq!(accrual.calls().len(), 3);

    let balance = svc.balances.get_balance(1).await.unwrap();
    assert_eq!(balance.current, dec("500.50"));
    assert_eq!(balance.withdrawn, Decimal::ZERO);

    let balance = svc
        .balances
        .withdraw(1, "2377225624", dec("500.50"))
        .await
        .unwrap();
    assert_eq!(balance.current, Decimal::ZERO);
    assert_eq!(balance.withdrawn, dec("500.50"));

    match svc.balances.withdraw(1, "2377225624", dec("0.01")).await {
        Err(LoyaltyError::InsufficientFunds {
            required,
            available,
        }) => {
            assert_eq!(required, dec("0.01"));
            assert_eq!(available, Decimal::ZERO);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let withdrawals = svc.balances.list_withdrawals(1).await.unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].order_number, "2377225624");
    assert_eq!(withdrawals[0].sum, dec("500.50"));
}

#[tokio::test]
async fn test_invalid_verdict_is_final_without_credit() {
    let svc = services();
    svc.orders.submit_order(1, "79927398713").await.unwrap();

    let outcome = svc
        .orders
        .apply_verdict("79927398713", OrderStatus::Invalid, Decimal::ZERO)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        VerdictOutcome::Applied {
            credited: Decimal::ZERO
        }
    );

    // 终态后再收到 PROCESSED 也不会入账
    let outcome = svc
        .orders
        .apply_verdict("79927398713", OrderStatus::Processed, dec("100"))
        .await
        .unwrap();
    assert_eq!(outcome, VerdictOutcome::AlreadyFinal);
    assert_eq!(svc.balances.get_balance(1).await.unwrap().current, Decimal::ZERO);
}

#[tokio::test]
async fn test_duplicate_verdict_credits_once() {
    let svc = services();
    svc.orders.submit_order(1, "12345678903").await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let orders = svc.orders.clone();
            tokio::spawn(async move {
                orders
                    .apply_verdict("12345678903", OrderStatus::Processed, dec("42"))
                    .await
            })
        })
        .collect();

    let mut applied = 0;
    for handle in handles {
        if let VerdictOutcome::Applied { .. } = handle.await.unwrap().unwrap() {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(svc.balances.get_balance(1).await.unwrap().current, dec("42"));
}

#[tokio::test]
async fn test_rate_limited_tick_keeps_processed_progress() {
    let svc = services();
    let base = Utc::now();
    for (i, number) in ["79927398713", "12345678903", "4561261212345467"]
        .iter()
        .enumerate()
    {
        svc.store
            .create_order(&Order::new(*number, 1, base + chrono::Duration::seconds(i as i64)))
            .await
            .unwrap();
    }

    let accrual = Arc::new(ScriptedAccrual::new());
    accrual.script(
        "79927398713",
        vec![verdict("79927398713", AccrualStatus::Processed, Some("10"))],
    );
    accrual.script(
        "12345678903",
        vec![
            AccrualResponse::RateLimited { retry_after: None },
            verdict("12345678903", AccrualStatus::Processed, Some("5")),
        ],
    );
    accrual.script(
        "4561261212345467",
        vec![verdict("4561261212345467", AccrualStatus::Invalid, None)],
    );

    let clock = Arc::new(ManualClock::new(epoch()));
    let mut reconciler = Reconciler::new(
        svc.orders.clone(),
        accrual.clone(),
        clock.clone(),
        Duration::from_secs(60),
    );
    let (_tx, shutdown) = watch::channel(false);

    let report = reconciler.run_tick(&shutdown).await;
    assert!(report.rate_limited);
    assert_eq!(report.applied, 1);
    assert_eq!(accrual.calls(), vec!["79927398713", "12345678903"]);
    assert_eq!(svc.balances.get_balance(1).await.unwrap().current, dec("10"));

    // 冷却期内：不发起任何查询
    clock.advance(chrono::Duration::seconds(59));
    assert!(reconciler.run_tick(&shutdown).await.cooling_down);
    assert_eq!(accrual.calls().len(), 2);

    // 冷却结束：从剩余的待处理订单继续
    clock.advance(chrono::Duration::seconds(1));
    let report = reconciler.run_tick(&shutdown).await;
    assert_eq!(report.pending, 2);
    assert_eq!(report.applied, 2);
    assert_eq!(
        accrual.calls(),
        vec![
            "79927398713",
            "12345678903",
            "12345678903",
            "4561261212345467"
        ]
    );
    assert_eq!(svc.balances.get_balance(1).await.unwrap().current, dec("15"));
}

// ==================== 并发 ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_credit_and_withdraw_never_overdraw() {
    let svc = services();

    let mut handles = Vec::new();
    for _ in 0..100 {
        let balances = svc.balances.clone();
        handles.push(tokio::spawn(async move {
            balances.credit(1, dec("1")).await.map(|_| false)
        }));
    }
    for _ in 0..150 {
        let balances = svc.balances.clone();
        handles.push(tokio::spawn(async move {
            match balances.withdraw(1, "2377225624", dec("1")).await {
                Ok(_) => Ok(true),
                Err(LoyaltyError::InsufficientFunds { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut succeeded_withdrawals: i64 = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            succeeded_withdrawals += 1;
        }
    }

    let balance = svc.balances.get_balance(1).await.unwrap();
    assert!(balance.current >= Decimal::ZERO);
    assert_eq!(balance.current + balance.withdrawn, dec("100"));
    assert_eq!(balance.withdrawn, Decimal::from(succeeded_withdrawals));

    let recorded: Decimal = svc
        .balances
        .list_withdrawals(1)
        .await
        .unwrap()
        .iter()
        .map(|w| w.sum)
        .sum();
    assert_eq!(recorded, balance.withdrawn);
}

// ==================== 金额精度 ====================

#[tokio::test]
async fn test_ledger_amounts_stay_in_cents() {
    let svc = services();
    svc.orders.submit_order(1, "79927398713").await.unwrap();
    svc.orders
        .apply_verdict("79927398713", OrderStatus::Processed, dec("10.005"))
        .await
        .unwrap();

    let balance = svc.balances.get_balance(1).await.unwrap();
    assert_eq!(balance.current, dec("10.01"));

    assert!(matches!(
        svc.balances.withdraw(1, "2377225624", dec("0.005")).await,
        Err(LoyaltyError::InvalidAmount(_))
    ));
    svc.balances
        .withdraw(1, "2377225624", dec("10.01"))
        .await
        .unwrap();

    let balance = svc.balances.get_balance(1).await.unwrap();
    assert_eq!(balance.current, Decimal::ZERO);
    assert_eq!(balance.withdrawn, dec("10.01"));
    assert_eq!(svc.balances.list_withdrawals(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_long_order_number_is_accepted() {
    let svc = services();
    let number = format!("{}{}", "0".repeat(60), "79927398713");

    assert_eq!(
        svc.orders.submit_order(1, &number).await.unwrap(),
        SubmitOutcome::Accepted
    );
    assert!(svc.store.find_order(&number).await.unwrap().is_some());
}
