#![no_main]
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};
use segbuf::{ArbitraryMemoryPool, MemoryManager, SizeClass};

#[derive(Debug, Arbitrary)]
enum PoolOp {
    Allocate { size: u16 },
    Dispose { slot: u8 },
    Recycle { slot: u8 },
    Drop { slot: u8 },
}

// Random allocate/recycle sequences must never panic or break the id bookkeeping
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let ops: Vec<PoolOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let pool = match ArbitraryMemoryPool::new(SizeClass::K4, SizeClass::B32, SizeClass::K1) {
        Ok(pool) => pool,
        Err(_) => return,
    };
    let mut held = Vec::new();

    for op in ops.iter().take(200) {
        match op {
            PoolOp::Allocate { size } => {
                if let Ok(segment) = pool.allocate(*size as usize) {
                    assert!(pool.contains(&segment));
                    held.push(segment);
                }
            }
            PoolOp::Dispose { slot } if !held.is_empty() => {
                let segment = held.swap_remove(*slot as usize % held.len());
                segment.dispose().unwrap();
            }
            PoolOp::Recycle { slot } if !held.is_empty() => {
                let segment = held.swap_remove(*slot as usize % held.len());
                pool.recycle(segment).unwrap();
            }
            PoolOp::Drop { slot } if !held.is_empty() => {
                held.swap_remove(*slot as usize % held.len());
            }
            _ => {}
        }
    }

    let stats = pool.stats();
    assert!(stats.allocated_bytes <= SizeClass::K4.bytes());
    assert!(stats.idle_segments <= stats.segments);
});
