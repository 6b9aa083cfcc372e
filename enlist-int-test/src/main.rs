use enlist::errors::EnlistResult;
use enlist::record;
use enlist_int_test::test_util::{cleanup, create_test_context};

#[tokio::main]
async fn main() -> EnlistResult<()> {
    println!("Starting stress test...");
    let ctx = create_test_context().await?;

    let transactions = 10_000;
    let rows_per_transaction = 10;
    let users = ctx.table("users");

    let start = std::time::Instant::now();
    for _ in 0..transactions {
        enlist::transaction(&[&users], |bound| async move {
            for _ in 0..rows_per_transaction {
                bound[0]
                    .insert(record! {
                        name: (uuid::Uuid::new_v4().to_string()),
                        processed: false,
                    })
                    .await?;
            }
            Ok(())
        })
        .await?;
    }
    let elapsed = start.elapsed();
    println!(
        "Committed {} transactions ({} rows) in {:?}",
        transactions,
        transactions * rows_per_transaction,
        elapsed
    );

    let start = std::time::Instant::now();
    let count = users.count().await?;
    println!("Counted {} rows in {:?}", count, start.elapsed());

    // Every failing scope must leave the row count untouched
    let start = std::time::Instant::now();
    for i in 0..transactions {
        let result: EnlistResult<()> = enlist::transaction(&[&users], |bound| async move {
            bound[0].insert(record! { name: "doomed" }).await?;
            Err(enlist::EnlistError::new(
                &format!("forced failure {}", i),
                enlist::ErrorKind::Internal,
            ))
        })
        .await;
        assert!(result.is_err());
    }
    println!(
        "Rolled back {} transactions in {:?}",
        transactions,
        start.elapsed()
    );

    let after_rollbacks = users.count().await?;
    assert_eq!(count, after_rollbacks);
    println!("Row count unchanged after rollbacks: {}", after_rollbacks);

    cleanup(ctx).await
}
