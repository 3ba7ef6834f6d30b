//! Kiwi Latest Query
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! Async superseding behavior of `LatestQuery`.
//!
//! Run with:
//!     cargo test -p kiwi-latest-query --test t_superseding

use std::time::Duration;

use kiwi_latest_query::{LatestQuery, LatestQueryError};
use tokio::sync::oneshot;

#[tokio::test]
async fn single_query_returns_its_output() {
    let latest = LatestQuery::new();
    let out = latest.run(async { 42 }).await;
    assert_eq!(out, Ok(42));
}

#[tokio::test]
async fn slow_older_query_is_discarded() {
    let latest = LatestQuery::new();
    let (release_old, old_gate) = oneshot::channel::<()>();

    let old = {
        let latest = latest.clone();
        tokio::spawn(async move {
            latest
                .run(async move {
                    let _ = old_gate.await;
                    "old"
                })
                .await
        })
    };

    // Let the old query issue its ticket before the new one.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let new = latest.run(async { "new" }).await;
    assert_eq!(new, Ok("new"));

    release_old.send(()).expect("old query still waiting");
    let old = old.await.expect("task join");
    assert!(
        matches!(old, Err(LatestQueryError::Superseded { ticket: 1, latest: 2 })),
        "older query should be superseded, got {:?}",
        old
    );
}

#[tokio::test]
async fn sequential_queries_all_succeed() {
    let latest = LatestQuery::new();
    for i in 0..5 {
        assert_eq!(latest.run(async move { i }).await, Ok(i));
    }
    assert_eq!(latest.latest(), 5);
}

#[tokio::test]
async fn invalidate_while_pending_discards_result() {
    let latest = LatestQuery::new();
    let (release, gate) = oneshot::channel::<()>();

    let pending = {
        let latest = latest.clone();
        tokio::spawn(async move {
            latest
                .run(async move {
                    let _ = gate.await;
                })
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    latest.invalidate();
    release.send(()).expect("query still waiting");

    let out = pending.await.expect("task join");
    assert!(out.is_err());
}
