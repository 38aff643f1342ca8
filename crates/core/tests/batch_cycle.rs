//! End-to-end batch cycles over a temporary watermark store.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use runwatch_core::testing::MockNotifier;
use runwatch_core::{BatchDriver, RunRange, StoreError, WatermarkStore};

/// A store plus status files on disk, ready for a batch run.
struct BatchFixture {
    dir: TempDir,
    store: WatermarkStore,
    notifier: Arc<MockNotifier>,
}

impl BatchFixture {
    /// Build a store from `(instrument, last_known_run, status_contents)`
    /// rows, writing one status file per instrument.
    fn new(rows: &[(&str, u64, &str)]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");

        let mut csv = String::new();
        for (name, last_known, status) in rows {
            let status_path = dir.path().join(format!("lastrun_{name}.txt"));
            fs::write(&status_path, status).unwrap();
            csv.push_str(&format!(
                "{name},{last_known},{status},{summary},{data},.nxs\n",
                status = status_path.display(),
                summary = dir.path().join(format!("summary_{name}.txt")).display(),
                data = dir.path().display(),
            ));
        }
        let store_path = dir.path().join("last_runs.csv");
        fs::write(&store_path, csv).unwrap();

        Self {
            dir,
            store: WatermarkStore::new(store_path),
            notifier: Arc::new(MockNotifier::new()),
        }
    }

    fn driver(&self) -> BatchDriver {
        BatchDriver::new(self.notifier.clone()).with_lock_timeout(Duration::from_millis(200))
    }

    fn store_bytes(&self) -> Vec<u8> {
        fs::read(self.store.path()).unwrap()
    }

    fn watermark_of(&self, instrument: &str) -> u64 {
        self.store
            .load()
            .unwrap()
            .into_iter()
            .find(|r| r.instrument_name == instrument)
            .unwrap()
            .last_known_run
    }

    fn set_status(&self, instrument: &str, contents: &str) {
        let path = self.dir.path().join(format!("lastrun_{instrument}.txt"));
        fs::write(path, contents).unwrap();
    }
}

#[tokio::test]
async fn test_new_run_is_delivered_and_watermark_advances() {
    let fixture = BatchFixture::new(&[("WISH", 44733, "WISH 44734 0")]);

    let summary = fixture.driver().run(&fixture.store).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.advanced, 1);
    assert_eq!(summary.failed, 0);

    let calls = fixture.notifier.recorded().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].instrument, "WISH");
    assert_eq!(calls[0].range, RunRange::between(44733, 44734).unwrap());

    assert_eq!(fixture.watermark_of("WISH"), 44734);
}

#[tokio::test]
async fn test_idle_reinvocation_delivers_nothing() {
    let fixture = BatchFixture::new(&[("WISH", 44733, "WISH 44734 0")]);

    fixture.driver().run(&fixture.store).await.unwrap();
    assert_eq!(fixture.notifier.recorded().await.len(), 1);

    // Status unchanged: the second batch must not deliver again.
    let summary = fixture.driver().run(&fixture.store).await.unwrap();
    assert_eq!(summary.advanced, 0);
    assert_eq!(fixture.notifier.recorded().await.len(), 1);
    assert_eq!(fixture.watermark_of("WISH"), 44734);
}

#[tokio::test]
async fn test_idle_reinvocation_leaves_store_byte_identical() {
    let fixture = BatchFixture::new(&[
        ("WISH", 44733, "WISH 44734 0"),
        ("GEM", 81200, "GEM 81200 0"),
    ]);

    fixture.driver().run(&fixture.store).await.unwrap();
    let first = fixture.store_bytes();

    fixture.driver().run(&fixture.store).await.unwrap();
    let second = fixture.store_bytes();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_next_delta_is_delivered_on_a_later_invocation() {
    let fixture = BatchFixture::new(&[("WISH", 44733, "WISH 44734 0")]);

    fixture.driver().run(&fixture.store).await.unwrap();
    assert_eq!(fixture.watermark_of("WISH"), 44734);

    // Two more runs complete before the next scheduled invocation.
    fixture.set_status("WISH", "WISH 44736 0");
    fixture.driver().run(&fixture.store).await.unwrap();

    let calls = fixture.notifier.recorded().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].range, RunRange::between(44734, 44736).unwrap());
    assert_eq!(fixture.watermark_of("WISH"), 44736);
}

#[tokio::test]
async fn test_delivered_run_count_matches_delta() {
    let fixture = BatchFixture::new(&[("WISH", 44731, "WISH 44733 0")]);

    fixture.driver().run(&fixture.store).await.unwrap();

    assert_eq!(fixture.notifier.delivered_runs("WISH").await, 2);
    assert_eq!(fixture.watermark_of("WISH"), 44733);
}

#[tokio::test]
async fn test_malformed_status_skips_instrument_only() {
    let fixture = BatchFixture::new(&[
        ("WISH", 44733, "WISH 44734"),
        ("GEM", 81200, "GEM 81201 0"),
    ]);

    let summary = fixture.driver().run(&fixture.store).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.advanced, 1);
    assert_eq!(summary.failed, 1);

    // The malformed instrument keeps its watermark; the healthy one
    // still advances in the same batch.
    assert_eq!(fixture.watermark_of("WISH"), 44733);
    assert_eq!(fixture.watermark_of("GEM"), 81201);
}

#[tokio::test]
async fn test_delivery_failure_skips_instrument_only() {
    let fixture = BatchFixture::new(&[
        ("WISH", 44733, "WISH 44734 0"),
        ("GEM", 81200, "GEM 81201 0"),
    ]);
    fixture.notifier.fail_instrument("WISH").await;

    let summary = fixture.driver().run(&fixture.store).await.unwrap();
    assert_eq!(summary.failed, 1);

    assert_eq!(fixture.watermark_of("WISH"), 44733);
    assert_eq!(fixture.watermark_of("GEM"), 81201);

    // The failed range is retried by the next invocation once the
    // transport recovers.
    let recovered = Arc::new(MockNotifier::new());
    let driver = BatchDriver::new(recovered.clone());
    driver.run(&fixture.store).await.unwrap();
    assert_eq!(recovered.delivered_runs("WISH").await, 1);
    assert_eq!(fixture.watermark_of("WISH"), 44734);
}

#[tokio::test]
async fn test_non_watermark_fields_survive_rewrites_verbatim() {
    let fixture = BatchFixture::new(&[("WISH", 44733, "WISH 44734 0")]);
    let before = fixture.store.load().unwrap();

    fixture.driver().run(&fixture.store).await.unwrap();
    let after = fixture.store.load().unwrap();

    assert_eq!(after.len(), before.len());
    assert_eq!(after[0].instrument_name, before[0].instrument_name);
    assert_eq!(after[0].status_file_path, before[0].status_file_path);
    assert_eq!(after[0].summary_file_path, before[0].summary_file_path);
    assert_eq!(after[0].data_directory, before[0].data_directory);
    assert_eq!(after[0].file_extension, before[0].file_extension);
}

#[tokio::test]
async fn test_row_order_is_preserved() {
    let fixture = BatchFixture::new(&[
        ("OSIRIS", 100, "OSIRIS 100 0"),
        ("WISH", 44733, "WISH 44734 0"),
        ("GEM", 81200, "GEM 81200 0"),
    ]);

    fixture.driver().run(&fixture.store).await.unwrap();

    let names: Vec<String> = fixture
        .store
        .load()
        .unwrap()
        .into_iter()
        .map(|r| r.instrument_name)
        .collect();
    assert_eq!(names, vec!["OSIRIS", "WISH", "GEM"]);
}

#[tokio::test]
async fn test_held_lock_aborts_batch_without_mutation() {
    let fixture = BatchFixture::new(&[("WISH", 44733, "WISH 44734 0")]);
    let before = fixture.store_bytes();

    let _held = fixture
        .store
        .lock(Duration::from_millis(100))
        .await
        .unwrap();

    let result = fixture.driver().run(&fixture.store).await;
    assert!(matches!(result, Err(StoreError::LockTimeout(_))));

    assert_eq!(fixture.store_bytes(), before);
    assert!(fixture.notifier.recorded().await.is_empty());
}

#[tokio::test]
async fn test_watermark_regression_does_not_rewind_store() {
    let fixture = BatchFixture::new(&[("WISH", 44733, "WISH 12 0")]);

    let summary = fixture.driver().run(&fixture.store).await.unwrap();
    assert_eq!(summary.advanced, 0);
    assert_eq!(summary.failed, 0);
    assert!(fixture.notifier.recorded().await.is_empty());
    assert_eq!(fixture.watermark_of("WISH"), 44733);
}
