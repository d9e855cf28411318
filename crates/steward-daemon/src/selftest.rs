//! End-to-end write/read verification of the storage pipeline.
//!
//! Each cycle writes a small sequence of probes and reads each one straight
//! back. All probes share one fixed entity name on purpose: the test
//! exercises the store's most-recent-write-wins behavior under a shared key,
//! not per-probe isolation.

use steward_store::{DynResourceStore, Payload, StoreError};
use tracing::{debug, error, warn};

/// Entity shared by every probe.
pub const SELF_TEST_ENTITY: &str = "_conthesis.self_test";
pub const PROBE_COUNT: usize = 3;

/// Per-probe pass/fail outcomes of one self-test pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestReport {
    results: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    AllPassed,
    Partial,
    Failed,
}

impl SelfTestReport {
    pub fn new(results: Vec<bool>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[bool] {
        &self.results
    }

    pub fn verdict(&self) -> Verdict {
        let passed = self.results.iter().filter(|p| **p).count();
        if passed == self.results.len() {
            Verdict::AllPassed
        } else if passed == 0 {
            Verdict::Failed
        } else {
            Verdict::Partial
        }
    }

    /// One `P` or `F` per probe, in probe order.
    pub fn pattern(&self) -> String {
        self.results
            .iter()
            .map(|passed| if *passed { 'P' } else { 'F' })
            .collect()
    }

    /// Success is silent; only total and partial failure make noise.
    pub fn log(&self) {
        match self.verdict() {
            Verdict::AllPassed => {}
            Verdict::Failed => error!("storage self-test failed completely"),
            Verdict::Partial => {
                warn!(pattern = %self.pattern(), "storage self-test partial failure");
            }
        }
    }
}

pub struct SelfTestRunner {
    store: DynResourceStore,
}

impl SelfTestRunner {
    pub fn new(store: DynResourceStore) -> Self {
        Self { store }
    }

    /// Run one self-test pass and log its outcome.
    ///
    /// A store or transport error aborts the pass and propagates; it is not
    /// recorded as a probe failure.
    pub async fn run(&self) -> Result<SelfTestReport, StoreError> {
        let mut results = Vec::with_capacity(PROBE_COUNT);
        for i in 0..PROBE_COUNT {
            let probe = format!("self_test/{i}").into_bytes();
            self.store
                .store_resource(SELF_TEST_ENTITY, &Payload::Bytes(probe.clone()))
                .await?;
            let read = self.store.get_resource(SELF_TEST_ENTITY).await?;
            let passed = read.as_deref() == Some(probe.as_slice());
            if !passed {
                debug!(probe = i, expected = %String::from_utf8_lossy(&probe), "self-test probe mismatch");
            }
            results.push(passed);
        }

        let report = SelfTestReport::new(results);
        report.log();
        Ok(report)
    }
}
