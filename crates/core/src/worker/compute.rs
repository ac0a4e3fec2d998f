use std::time::Instant;

use tracing::info;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// CPU-bound placeholder workload. The result is only logged.
#[derive(Debug, Clone, Copy)]
pub struct ComputeWorker {
    iterations: u64,
}

impl ComputeWorker {
    pub fn new(iterations: u64) -> Self {
        Self { iterations }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn run(&self, task_name: &str) -> u64 {
        let started = Instant::now();
        let result = reduce(seed(task_name), self.iterations);
        info!(
            task_name,
            iterations = self.iterations,
            result,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "computation finished"
        );
        result
    }
}

/// Multiply-xorshift fold. Same inputs always give the same output.
pub fn reduce(seed: u64, iterations: u64) -> u64 {
    // xorshift never leaves zero, so force an odd start.
    let mut state = seed | 1;
    let mut acc = FNV_OFFSET;
    for _ in 0..iterations {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        acc = (acc ^ state).wrapping_mul(FNV_PRIME);
    }
    acc
}

fn seed(task_name: &str) -> u64 {
    task_name
        .bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}
