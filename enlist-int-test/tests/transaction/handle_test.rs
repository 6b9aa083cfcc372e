use enlist::errors::ErrorKind;
use enlist::{bind, record, TransactionState};
use enlist_int_test::test_util::{cleanup, create_test_context, run_test};

// ==================== Explicit Commit Tests ====================

/// Scenario C: explicit open, two inserts, commit; a second commit fails
/// with an already-settled error.
#[tokio::test]
async fn test_explicit_commit_persists_and_settles_once() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");

            let (tx, bound) = enlist::begin_transaction(&[&users]).await?;
            bound[0].insert(record! { name: "Alice" }).await?;
            bound[0].insert(record! { name: "Bob" }).await?;

            assert_eq!(ctx.driver().committed_rows("users"), 0);
            tx.commit().await?;
            assert_eq!(ctx.driver().committed_rows("users"), 2);

            let second = tx.commit().await;
            assert_eq!(second.unwrap_err().kind(), &ErrorKind::AlreadySettled);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_explicit_open_on_connection_and_bind() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");
            let connection = ctx.connection();

            let tx = enlist::begin_transaction_on(&connection).await?;
            assert_eq!(tx.state(), TransactionState::Open);

            tx.bind(&users).insert(record! { name: "Alice" }).await?;
            tx.commit().await?;

            assert_eq!(tx.state(), TransactionState::Closed);
            assert_eq!(ctx.driver().committed_rows("users"), 1);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_bindings_of_one_scope_share_the_transaction() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");
            let accounts = ctx.table("accounts");

            let (tx, bound) = enlist::begin_transaction(&[&users, &accounts]).await?;
            bound[0].insert(record! { name: "Alice" }).await?;
            bound[1].insert(record! { owner: "Alice" }).await?;

            // Exactly one physical transaction for the whole scope
            assert_eq!(ctx.driver().transactions_begun(), 1);

            tx.rollback().await?;
            assert_eq!(ctx.driver().committed_rows("users"), 0);
            assert_eq!(ctx.driver().committed_rows("accounts"), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

// ==================== Explicit Rollback Tests ====================

/// Scenario D: explicit rollback discards the insert, the entity still hands
/// out the closed context, and bindings derived from it refuse queries.
#[tokio::test]
async fn test_explicit_rollback_and_entity_context_afterwards() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");

            let (tx, bound) = enlist::begin_transaction(&[&users]).await?;
            let entity = bound[0].insert(record! { name: "Alice" }).await?;

            tx.rollback().await?;
            assert_eq!(ctx.driver().committed_rows("users"), 0);

            // The entity still returns its (now closed) context
            let context = entity.transaction();
            assert!(context.is_transactional());
            assert_eq!(
                context.as_transaction().map(|t| t.state()),
                Some(TransactionState::Closed)
            );

            // A fresh binding from that context fails fast
            let late = bind(&users, &context);
            let executed_before = ctx.driver().executed_queries();
            let result = late.insert(record! { name: "late" }).await;
            assert_eq!(result.unwrap_err().kind(), &ErrorKind::ClosedTransaction);
            assert_eq!(ctx.driver().executed_queries(), executed_before);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_commit_after_rollback_fails_with_already_settled() {
    run_test(
        create_test_context,
        |ctx| async move {
            let tx = enlist::begin_transaction_on(&ctx.connection()).await?;
            tx.rollback().await?;

            let result = tx.commit().await;
            assert_eq!(result.unwrap_err().kind(), &ErrorKind::AlreadySettled);
            let result = tx.rollback().await;
            assert_eq!(result.unwrap_err().kind(), &ErrorKind::AlreadySettled);
            Ok(())
        },
        cleanup,
    )
    .await
}

// ==================== Closed-Transaction Tests ====================

#[tokio::test]
async fn test_query_after_settlement_never_reaches_the_database() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");

            let (tx, bound) = enlist::begin_transaction(&[&users]).await?;
            bound[0].insert(record! { name: "Alice" }).await?;
            tx.commit().await?;

            let executed_before = ctx.driver().executed_queries();
            let result = bound[0].insert(record! { name: "late" }).await;

            assert_eq!(result.unwrap_err().kind(), &ErrorKind::ClosedTransaction);
            assert_eq!(ctx.driver().executed_queries(), executed_before);
            assert_eq!(ctx.driver().committed_rows("users"), 1);
            Ok(())
        },
        cleanup,
    )
    .await
}

// ==================== Entity Chaining Tests ====================

#[tokio::test]
async fn test_chained_binding_from_entity_joins_same_transaction() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");
            let accounts = ctx.table("accounts");

            let (tx, bound) = enlist::begin_transaction(&[&users]).await?;
            let entity = bound[0].insert(record! { name: "Alice" }).await?;

            // Bind a second model from the entity's context alone
            let bound_accounts = bind(&accounts, &entity.connection());
            bound_accounts.insert(record! { owner: "Alice" }).await?;

            tx.commit().await?;
            assert_eq!(ctx.driver().committed_rows("users"), 1);
            assert_eq!(ctx.driver().committed_rows("accounts"), 1);
            Ok(())
        },
        cleanup,
    )
    .await
}

// ==================== Degenerate Binding Tests ====================

#[tokio::test]
async fn test_binding_to_raw_connection_needs_no_settlement() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");
            let bound = bind(&users, &ctx.connection().into());

            let entity = bound.insert(record! { name: "Alice" }).await?;
            assert!(!entity.transaction().is_transactional());

            // Committed immediately; no transaction was opened
            assert_eq!(ctx.driver().committed_rows("users"), 1);
            assert_eq!(ctx.driver().transactions_begun(), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

// ==================== Isolation Tests ====================

#[tokio::test]
async fn test_uncommitted_writes_invisible_outside_transaction() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");

            let (tx, bound) = enlist::begin_transaction(&[&users]).await?;
            bound[0].insert(record! { name: "Alice" }).await?;

            // Inside the transaction the row is visible
            assert_eq!(bound[0].count().await?, 1);
            // Outside, through the unbound model, it is not
            assert_eq!(users.count().await?, 0);

            tx.commit().await?;
            assert_eq!(users.count().await?, 1);
            Ok(())
        },
        cleanup,
    )
    .await
}
