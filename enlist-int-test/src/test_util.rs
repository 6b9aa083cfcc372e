use enlist::driver::MemoryDriver;
use enlist::errors::{EnlistError, EnlistResult, ErrorKind};
use enlist::{Connection, Table};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs an async test with retry logic and panic capture.
///
/// The test runs up to three times; `before` builds a fresh context per
/// attempt and `after` is given a chance to clean up whether the test passed
/// or failed.
pub async fn run_test<B, BFut, T, TFut, A, AFut>(before: B, test: T, after: A)
where
    B: Fn() -> BFut,
    BFut: Future<Output = EnlistResult<TestContext>>,
    T: Fn(TestContext) -> TFut,
    TFut: Future<Output = EnlistResult<()>>,
    A: Fn(TestContext) -> AFut,
    AFut: Future<Output = EnlistResult<()>>,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = AssertUnwindSafe(async {
            let ctx = match before().await {
                Ok(ctx) => ctx,
                Err(e) => return Err(format!("Before run failed: {:?}", e)),
            };
            match test(ctx.clone()).await {
                Ok(()) => match after(ctx).await {
                    Ok(()) => Ok(()),
                    Err(e) => Err(format!("After run failed: {:?}", e)),
                },
                Err(e) => {
                    let _ = after(ctx).await;
                    Err(format!("Test failed: {:?}", e))
                }
            }
        })
        .catch_unwind()
        .await;

        let elapsed = start_time.elapsed();

        match result {
            Ok(Ok(())) => return, // Test passed
            Ok(Err(e)) => {
                last_error = Some(e);
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_error = Some(format!("Panic: {}", err_msg));
            }
        }

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", last_error.as_deref().unwrap_or("Unknown"));
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
        }
    }

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

/// A fresh in-memory driver and a connection over it.
#[derive(Clone)]
pub struct TestContext {
    driver: MemoryDriver,
    connection: Connection,
}

impl TestContext {
    pub fn new() -> Self {
        let driver = MemoryDriver::new();
        let connection = Connection::new(Arc::new(driver.clone()));
        Self { driver, connection }
    }

    pub fn driver(&self) -> MemoryDriver {
        self.driver.clone()
    }

    pub fn connection(&self) -> Connection {
        self.connection.clone()
    }

    /// A table model homed on this context's connection.
    pub fn table(&self, name: &str) -> Table {
        Table::new(name, self.connection.clone())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn create_test_context() -> EnlistResult<TestContext> {
    Ok(TestContext::new())
}

/// Verifies the test settled every transaction it opened.
pub async fn cleanup(ctx: TestContext) -> EnlistResult<()> {
    let open = ctx.driver().open_transactions();
    if open > 0 {
        return Err(EnlistError::new(
            &format!("Test leaked {} open transaction(s)", open),
            ErrorKind::Internal,
        ));
    }
    Ok(())
}
