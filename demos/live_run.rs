//! Simulated run through the store, printing live stats as they change.
//!
//! Run with: cargo run --example live_run

use stride_engine::{
    format_duration, format_pace, GeoSample, IngestOutcome, MemoryStore, RunStore,
};

fn main() {
    // A short loop along the Thames (London area), one fix every 5 seconds
    let fixes = [
        (51.5007, -0.1246, 5.0),
        (51.5010, -0.1240, 6.0),
        (51.5010, -0.12399, 4.0), // jitter
        (51.5014, -0.1232, 32.0), // weak signal
        (51.5018, -0.1225, 8.0),
        (51.5023, -0.1217, 5.0),
        (51.5027, -0.1209, 5.0),
        (51.5031, -0.1201, 7.0),
    ];

    let mut store = RunStore::open(MemoryStore::new());

    let outcome = store.start().expect("idle store always starts");
    println!("Live Run Example\n");
    println!("Started activity {}\n", outcome.activity_id());

    for (i, (lat, lng, accuracy)) in fixes.iter().enumerate() {
        let sample = GeoSample::new(*lat, *lng, i as i64 * 5_000, *accuracy);
        let outcome = store.ingest(sample).expect("valid coordinate");
        for _ in 0..5 {
            store.tick();
        }

        let stats = store.current_stats();
        let note = match outcome {
            IngestOutcome::Jitter { .. } => " (jitter)",
            IngestOutcome::WeakSignal { .. } => " (weak signal)",
            _ => "",
        };
        println!(
            "  {:>5}  {:.3} km  pace {}/km{}",
            format_duration(stats.elapsed_seconds),
            stats.distance_km,
            format_pace(stats.pace_sec_per_km),
            note
        );
    }

    store.pause();
    println!("\nPaused; this fix is ignored: {:?}", store.ingest(GeoSample::new(51.6, -0.1, 0, 5.0)));
    store.resume();

    let run = store.stop().expect("memory store never fails").expect("run was active");
    println!("\nFinished {}", run.kind.label());
    println!("  Duration:  {}", format_duration(run.duration_seconds));
    println!("  Distance:  {:.3} km", run.distance_km);
    println!("  Avg pace:  {}/km", format_pace(run.average_pace_sec_per_km));
    println!("  Energy:    {} kcal", run.energy_estimate_kcal);
    println!("  Route:     {} fixes", run.route.len());

    let week = store.weekly_summary();
    println!(
        "\nThis week: {} run(s), {:.2} km ({:.0}% of goal)",
        week.runs, week.distance_km, week.distance_progress_pct
    );
}
