#![no_main]
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};
use segbuf::{ByteString, Bytes, FixedMemoryPool, MemoryManager, Model, Segment, SizeClass, Width};

#[derive(Debug, Arbitrary)]
enum Op {
    Write { index: u8, width: u8, value: u64 },
    Limit { limit: u8 },
    Clear,
}

fn width_of(tag: u8) -> Width {
    match tag % 4 {
        0 => Width::Byte,
        1 => Width::Short,
        2 => Width::Int,
        _ => Width::Long,
    }
}

// Every backend must accept, reject and checksum the same operations identically
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let ops: Vec<Op> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let pool = match FixedMemoryPool::new(SizeClass::B256, SizeClass::B256) {
        Ok(pool) => pool,
        Err(_) => return,
    };
    let mut memory = match pool.allocate(256) {
        Ok(segment) => segment,
        Err(_) => return,
    };
    let mut bytes = Segment::unmanaged(Bytes::new(256));
    let mut model = Segment::unmanaged(Model::new(256));

    // Fresh native memory is zeroed like the heap backends
    for op in ops.iter().take(256) {
        let results: Vec<bool> = [&mut bytes as &mut dyn ByteString, &mut model, &mut memory]
            .into_iter()
            .map(|segment| match op {
                Op::Write { index, width, value } => {
                    segment.write(*index as usize, width_of(*width), *value).is_ok()
                }
                Op::Limit { limit } => segment.limit_at(*limit as usize).is_ok(),
                Op::Clear => segment.clear().is_ok(),
            })
            .collect();

        assert!(results.iter().all(|&ok| ok == results[0]), "{:?} diverged: {:?}", op, results);
    }

    let expected = bytes.check_sum_with(7).unwrap();
    assert_eq!(model.check_sum_with(7).unwrap(), expected);
    assert_eq!(memory.check_sum_with(7).unwrap(), expected);
});
