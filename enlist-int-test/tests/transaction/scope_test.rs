use super::FailingDriver;
use enlist::errors::{EnlistError, EnlistResult, ErrorKind};
use enlist::report::{self, ErrorReporter};
use enlist::{record, Connection, Table};
use enlist_int_test::test_util::{cleanup, create_test_context, run_test};
use std::sync::{Arc, Mutex};

// ==================== Implicit Runner Tests ====================

/// Scenario A: one closure, two models, both inserts commit together and the
/// closure's value comes back.
#[tokio::test]
async fn test_run_commits_across_two_models() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");
            let accounts = ctx.table("accounts");

            let value = enlist::transaction(&[&users, &accounts], |bound| async move {
                bound[0].insert(record! { name: "Alice" }).await?;
                bound[1].insert(record! { owner: "Alice" }).await?;
                Ok(record! { a: 1 })
            })
            .await?;

            assert_eq!(value, record! { a: 1 });
            assert_eq!(ctx.driver().committed_rows("users"), 1);
            assert_eq!(ctx.driver().committed_rows("accounts"), 1);
            Ok(())
        },
        cleanup,
    )
    .await
}

/// Scenario B: same shape, but the closure fails after both inserts; neither
/// row survives.
#[tokio::test]
async fn test_run_rolls_back_across_two_models() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");
            let accounts = ctx.table("accounts");

            let result: EnlistResult<()> =
                enlist::transaction(&[&users, &accounts], |bound| async move {
                    bound[0].insert(record! { name: "Alice" }).await?;
                    bound[1].insert(record! { owner: "Alice" }).await?;
                    Err(EnlistError::new("unit of work failed", ErrorKind::Internal))
                })
                .await;

            assert!(result.is_err());
            assert_eq!(result.unwrap_err().message(), "unit of work failed");
            assert_eq!(ctx.driver().committed_rows("users"), 0);
            assert_eq!(ctx.driver().committed_rows("accounts"), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_run_rolls_back_regardless_of_prior_successes() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");

            let result: EnlistResult<()> = enlist::transaction(&[&users], |bound| async move {
                for i in 0..10 {
                    bound[0].insert(record! { seq: i }).await?;
                }
                Err(EnlistError::new("failed late", ErrorKind::Internal))
            })
            .await;

            assert!(result.is_err());
            // All ten successful inserts are gone
            assert_eq!(ctx.driver().committed_rows("users"), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_run_with_empty_closure_still_commits() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");

            let value =
                enlist::transaction(&[&users], |_bound| async move { Ok("nothing to do") })
                    .await?;

            assert_eq!(value, "nothing to do");
            // The transaction was opened and committed, not optimized away
            assert_eq!(ctx.driver().transactions_begun(), 1);
            assert_eq!(ctx.driver().open_transactions(), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_run_sequential_inserts_commit_in_submission_order() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");

            enlist::transaction(&[&users], |bound| async move {
                for i in 0..5 {
                    bound[0].insert(record! { seq: i }).await?;
                }
                Ok(())
            })
            .await?;

            let rows = users.find_all().await?;
            let sequence: Vec<i64> = rows.iter().filter_map(|r| r.get_int("seq")).collect();
            assert_eq!(sequence, vec![0, 1, 2, 3, 4]);
            Ok(())
        },
        cleanup,
    )
    .await
}

// ==================== Validation Tests ====================

#[tokio::test]
async fn test_run_with_no_models_fails_before_begin() {
    run_test(
        create_test_context,
        |ctx| async move {
            let result: EnlistResult<()> = enlist::transaction(&[], |_bound| async move {
                panic!("closure must not run");
            })
            .await;

            assert!(result.is_err());
            assert_eq!(result.unwrap_err().kind(), &ErrorKind::InvalidInput);
            // Verified via the driver: no begin call ever happened
            assert_eq!(ctx.driver().transactions_begun(), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_run_with_models_on_two_connections_fails() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");
            let other = enlist_int_test::test_util::TestContext::new();
            let foreign = other.table("accounts");

            let result: EnlistResult<()> =
                enlist::transaction(&[&users, &foreign], |_bound| async move {
                    panic!("closure must not run");
                })
                .await;

            assert!(result.is_err());
            assert_eq!(result.unwrap_err().kind(), &ErrorKind::InvalidInput);
            assert_eq!(ctx.driver().transactions_begun(), 0);
            assert_eq!(other.driver().transactions_begun(), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

// ==================== Failure Propagation Tests ====================

#[tokio::test]
async fn test_commit_failure_supersedes_closure_success() {
    let connection = Connection::new(Arc::new(FailingDriver::failing_commit()));
    let users = Table::new("users", connection);

    let result = enlist::transaction(&[&users], |bound| async move {
        bound[0].insert(record! { name: "Alice" }).await?;
        Ok(7)
    })
    .await;

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Commit);
    assert!(err.cause().is_some());
}

struct CapturingReporter {
    seen: Mutex<Vec<String>>,
}

impl ErrorReporter for CapturingReporter {
    fn report(&self, error: &EnlistError) {
        self.seen.lock().unwrap().push(error.message().to_string());
    }
}

#[tokio::test]
async fn test_rollback_failure_is_suppressed_and_reported() {
    let reporter = Arc::new(CapturingReporter {
        seen: Mutex::new(Vec::new()),
    });
    let reporter_ref = report::install(reporter.clone());

    let connection = Connection::new(Arc::new(FailingDriver::failing_rollback()));
    let users = Table::new("users", connection);

    let result: EnlistResult<()> = enlist::transaction(&[&users], |_bound| async move {
        Err(EnlistError::new("the actual cause", ErrorKind::Internal))
    })
    .await;

    report::remove(reporter_ref);

    // The closure's error is the caller-visible result
    assert_eq!(result.unwrap_err().message(), "the actual cause");
    // The rollback failure went to the reporter instead
    let seen = reporter.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("roll back"));
}

// ==================== Fan-Out Tests ====================

/// Scenario E: one branch races the rollback triggered by another branch's
/// failure; no row from either branch survives.
#[tokio::test]
async fn test_raced_insert_does_not_survive_rollback() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");
            let join_slot: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>> =
                Arc::new(Mutex::new(None));

            let result: EnlistResult<()> = enlist::transaction(&[&users], {
                let join_slot = join_slot.clone();
                |bound| async move {
                    let racing = bound[0].clone();
                    let join = tokio::spawn(async move {
                        // May be admitted before the rollback (overlay is
                        // discarded) or refused after it; never committed
                        let _ = racing.insert(record! { name: "raced" }).await;
                    });
                    join_slot.lock().unwrap().replace(join);
                    Err(EnlistError::new("fan-out branch failed", ErrorKind::Internal))
                }
            })
            .await;

            assert!(result.is_err());

            let join = join_slot.lock().unwrap().take();
            if let Some(join) = join {
                let _ = join.await;
            }

            assert_eq!(ctx.driver().committed_rows("users"), 0);
            assert_eq!(ctx.driver().open_transactions(), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_fan_out_with_one_failure_rolls_back_all_branches() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");

            let result: EnlistResult<()> = enlist::transaction(&[&users], |bound| async move {
                let branches = (0..4).map(|i| {
                    let bound = bound[0].clone();
                    async move {
                        if i == 2 {
                            Err(EnlistError::new("branch 2 failed", ErrorKind::Internal))
                        } else {
                            bound.insert(record! { branch: i }).await.map(|_| ())
                        }
                    }
                });

                // The commit/rollback decision is made only after every
                // branch has settled
                let outcomes = futures::future::join_all(branches).await;
                outcomes.into_iter().collect::<EnlistResult<Vec<()>>>()?;
                Ok(())
            })
            .await;

            assert!(result.is_err());
            // The three successful branches left nothing behind
            assert_eq!(ctx.driver().committed_rows("users"), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

// ==================== Connection-Based Runner Tests ====================

#[tokio::test]
async fn test_run_on_connection_commits_on_ok() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.table("users");
            let connection = ctx.connection();

            enlist::transaction_on(&connection, |tx| {
                let users = users.clone();
                async move {
                    tx.bind(&users).insert(record! { name: "Alice" }).await?;
                    Ok(())
                }
            })
            .await?;

            assert_eq!(ctx.driver().committed_rows("users"), 1);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_run_on_connection_refuses_explicit_settlement() {
    run_test(
        create_test_context,
        |ctx| async move {
            let connection = ctx.connection();

            enlist::transaction_on(&connection, |tx| async move {
                // The scope owns settlement; the handle refuses it
                let refused = tx.commit().await;
                assert_eq!(refused.unwrap_err().kind(), &ErrorKind::AlreadySettled);
                let refused = tx.rollback().await;
                assert_eq!(refused.unwrap_err().kind(), &ErrorKind::AlreadySettled);
                Ok(())
            })
            .await?;

            assert_eq!(ctx.driver().open_transactions(), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}
