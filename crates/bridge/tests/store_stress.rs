use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use glam::DVec3;

use aerobridge::{CanonicalStore, ParsedValue, Registry, SnapshotSerializer, parse_snapshot};

const TICKS: u32 = 2000;
const SLOTS: [&str; 4] = [
    "Aircraft.Altitude",
    "Aircraft.Height",
    "Aircraft.GroundSpeed",
    "Controls.Throttle",
];

/// Every tick writes the tick number into several slots. A reader that ever
/// sees two of them disagree, or disagree with the header counter, saw a torn
/// snapshot.
#[test]
fn readers_never_see_mixed_ticks() {
    let registry = Arc::new(Registry::new().unwrap());
    let store = Arc::new(CanonicalStore::new(Arc::clone(&registry)));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let registry = Arc::clone(store.registry());
                let slots: Vec<_> = SLOTS.iter().map(|n| registry.by_name(n).unwrap()).collect();
                let position = registry.by_name("Aircraft.Position").unwrap();
                let mut reads = 0u64;
                let mut last = 0;
                loop {
                    let view = store.read();
                    let counter = view.header().update_counter;
                    assert!(counter >= last, "counter went backwards");
                    last = counter;
                    for slot in &slots {
                        assert_eq!(view.scalar(slot), counter as f64);
                    }
                    assert_eq!(view.vector3(position), DVec3::splat(counter as f64));
                    reads += 1;
                    if done.load(Ordering::Acquire) {
                        break;
                    }
                }
                reads
            })
        })
        .collect();

    let serializer_store = Arc::clone(&store);
    let serializer_done = Arc::clone(&done);
    let serializer = thread::spawn(move || {
        let registry = Arc::clone(serializer_store.registry());
        let mut serializer = SnapshotSerializer::new(&registry);
        let mut documents = 0u64;
        loop {
            let json = serializer.render(&serializer_store.read());
            let snapshot = parse_snapshot(&registry, &json).unwrap();
            let expected = snapshot.update_counter as f64;
            for name in SLOTS {
                assert_eq!(snapshot.variables[name], ParsedValue::Number(expected));
            }
            documents += 1;
            if serializer_done.load(Ordering::Acquire) {
                break;
            }
        }
        documents
    });

    let slots: Vec<_> = SLOTS.iter().map(|n| registry.by_name(n).unwrap()).collect();
    let position = registry.by_name("Aircraft.Position").unwrap();
    for tick in 1..=TICKS {
        store.write_tick(|writer| {
            for slot in &slots {
                writer.set_scalar(slot, tick as f64);
            }
            writer.set_vector3(position, DVec3::splat(tick as f64));
        });
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert!(serializer.join().unwrap() > 0);

    let header = store.header();
    assert_eq!(header.update_counter, TICKS);
    assert!(header.data_valid);
}

#[test]
fn timestamps_never_decrease() {
    let registry = Arc::new(Registry::new().unwrap());
    let store = CanonicalStore::new(registry);
    let mut previous = 0;
    for _ in 0..500 {
        store.write_tick(|_| {});
        let stamp = store.header().timestamp_us;
        assert!(stamp >= previous);
        previous = stamp;
    }
}
