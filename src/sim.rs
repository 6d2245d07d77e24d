//! Multi-replica sync simulation.
//!
//! Spins up a set of note replicas, lets each perform a burst of random
//! offline edits, then exchanges snapshots between random pairs before a
//! closing round-robin. The run reports timing and verifies that every
//! replica reads the identical note at the end.

use async_stream::stream;
use futures::stream::Stream;
use futures::stream::StreamExt;
use quill_core::SiteId;
use quill_note::{CRDTNote, NoteId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Statistics collected during a simulation run
#[derive(Clone, Debug)]
pub struct SimStats {
    pub num_replicas: usize,
    pub edits_per_replica: usize,
    pub total_syncs: usize,
    pub total_time: Duration,
    pub avg_sync_time: Duration,
    pub final_text_len: usize,
    pub converged: bool,
}

impl SimStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Sync Simulation Statistics                     ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Number of Replicas:        {:>30} ║", self.num_replicas);
        println!("║  Edits per Replica:         {:>30} ║", self.edits_per_replica);
        println!("║  Snapshot Exchanges:        {:>30} ║", self.total_syncs);
        println!(
            "║  Total Time:                {:>29}s ║",
            format!("{:.3}", self.total_time.as_secs_f64())
        );
        println!(
            "║  Average Exchange Time:     {:>28}µs ║",
            format!("{:.2}", self.avg_sync_time.as_micros())
        );
        println!("║  Final Visible Length:      {:>30} ║", self.final_text_len);
        println!(
            "║  Converged:                 {:>30} ║",
            if self.converged { "yes" } else { "NO" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// Generator yielding random replica pairs for the exchange phase
fn sync_pair_stream(num_replicas: usize, num_syncs: usize, seed: u64) -> impl Stream<Item = (usize, usize)> {
    stream! {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..num_syncs {
            let a = rng.gen_range(0..num_replicas);
            let b = rng.gen_range(0..num_replicas);
            yield (a, b);
        }
    }
}

/// Perform a burst of random offline edits on one replica.
fn random_edits(note: &mut CRDTNote, rng: &mut StdRng, count: usize) {
    for _ in 0..count {
        match rng.gen_range(0..10) {
            // Mostly typing.
            0..=6 => {
                let pos = rng.gen_range(0..=note.body().len());
                let ch = rng.gen_range(b'a'..=b'z') as char;
                note.insert_at(pos, &ch.to_string())
                    .expect("local insert anchors on local state");
            }
            7..=8 => {
                if note.body().len() > 0 {
                    let pos = rng.gen_range(0..note.body().len());
                    note.delete_range(pos, 1);
                }
            }
            _ => {
                note.set_title(&format!("rev-{}", rng.gen_range(0..1000)));
            }
        }
    }
}

/// Run one simulation: divergent edits, random exchanges, convergence check.
pub async fn run_note_sim(
    num_replicas: usize,
    edits_per_replica: usize,
    num_syncs: usize,
    seed: u64,
) -> SimStats {
    println!("\n── note sync simulation: {} replicas, {} edits each, {} exchanges ──",
        num_replicas, edits_per_replica, num_syncs);

    let start = Instant::now();
    let note_id = NoteId::generate();

    // One note instance per replica; a mutex per note, as a multi-threaded
    // host would hold it.
    let replicas: Vec<Arc<Mutex<CRDTNote>>> = (0..num_replicas)
        .map(|_| Arc::new(Mutex::new(CRDTNote::new(note_id.clone(), SiteId::generate()))))
        .collect();

    // Offline phase: every replica edits independently.
    let mut editors = Vec::new();
    for (i, replica) in replicas.iter().enumerate() {
        let replica = Arc::clone(replica);
        editors.push(tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed ^ (i as u64 + 1));
            let mut note = replica.lock().await;
            random_edits(&mut note, &mut rng, edits_per_replica);
        }));
    }
    for editor in editors {
        editor.await.expect("editor task");
    }

    // Exchange phase: random pairs swap snapshots.
    let mut sync_times = Vec::new();
    let mut total_syncs = 0;
    let mut pairs = Box::pin(sync_pair_stream(num_replicas, num_syncs, seed));
    while let Some((a, b)) = pairs.next().await {
        if a == b {
            continue;
        }
        let sync_start = Instant::now();

        let snap_a = replicas[a].lock().await.snapshot();
        let snap_b = replicas[b].lock().await.snapshot();
        replicas[b]
            .lock()
            .await
            .merge_snapshot(&snap_a)
            .expect("well-formed snapshot merges");
        replicas[a]
            .lock()
            .await
            .merge_snapshot(&snap_b)
            .expect("well-formed snapshot merges");

        sync_times.push(sync_start.elapsed());
        total_syncs += 1;
    }

    // Closing round-robin so every replica has observed every edit.
    for src in 0..num_replicas {
        let snap = replicas[src].lock().await.snapshot();
        for (dst, replica) in replicas.iter().enumerate() {
            if dst != src {
                replica
                    .lock()
                    .await
                    .merge_snapshot(&snap)
                    .expect("well-formed snapshot merges");
            }
        }
    }

    // Convergence check.
    let reference = replicas[0].lock().await.snapshot();
    let mut converged = true;
    for replica in &replicas[1..] {
        if !replica.lock().await.snapshot().same_content(&reference) {
            converged = false;
        }
    }

    let total_time = start.elapsed();
    let avg_sync_time = if sync_times.is_empty() {
        Duration::ZERO
    } else {
        sync_times.iter().sum::<Duration>() / sync_times.len() as u32
    };

    let final_text_len = replicas[0].lock().await.body().len();

    SimStats {
        num_replicas,
        edits_per_replica,
        total_syncs,
        total_time,
        avg_sync_time,
        final_text_len,
        converged,
    }
}
