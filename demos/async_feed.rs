//! Drive a store from an async GPS feed and a one-second ticker.
//!
//! Run with: cargo run --example async_feed --features feeds

use std::time::Duration;

use stride_engine::{
    format_duration, spawn_ticker, EventDriver, GeoSample, MemoryStore, RunStore, TrackerEvent,
};

#[tokio::main]
async fn main() {
    let store = RunStore::open(MemoryStore::new());

    let (driver, events) = EventDriver::new(store, 32);
    let driver = tokio::spawn(driver.run());

    // Speed up time: one "second" every 50ms
    let ticker = spawn_ticker(events.clone(), Duration::from_millis(50));

    events.send(TrackerEvent::Start).await.ok();
    for i in 0..10 {
        let fix = GeoSample::new(40.7128 + i as f64 * 0.0002, -74.0060, i * 1_000, 5.0);
        events.send(TrackerEvent::Fix(fix)).await.ok();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    events
        .send(TrackerEvent::FeedError("simulated signal loss".to_string()))
        .await
        .ok();
    events.send(TrackerEvent::Stop).await.ok();

    ticker.abort();
    drop(events);

    let store = match driver.await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Driver task failed: {}", e);
            return;
        }
    };

    for run in store.history().iter() {
        println!(
            "{}: {:.3} km in {} over {} fixes",
            run.id,
            run.distance_km,
            format_duration(run.duration_seconds),
            run.route.len()
        );
    }
}
