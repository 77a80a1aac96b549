use std::collections::HashSet;

use log::{debug, warn};

use crate::host::SimMessage;
use crate::registry::SlotId;

use super::TickWriter;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub applied: usize,
    pub unknown: usize,
    pub mismatched: usize,
}

/// Tick-side state for applying simulation messages. Remembers which unknown
/// ids and mismatched payloads were already reported so each is logged once.
#[derive(Debug, Default)]
pub struct Ingest {
    unknown: HashSet<SlotId>,
    mismatched: HashSet<SlotId>,
}

impl Ingest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, writer: &mut TickWriter<'_>, messages: &[SimMessage]) -> IngestSummary {
        let registry = writer.registry();
        let mut summary = IngestSummary::default();

        for message in messages {
            let Some(slot) = registry.by_id(message.id) else {
                summary.unknown += 1;
                if self.unknown.insert(message.id) {
                    debug!("ignoring unknown message id {:#018x}", message.id);
                }
                continue;
            };

            if writer.apply(slot, &message.value) {
                summary.applied += 1;
            } else {
                summary.mismatched += 1;
                if self.mismatched.insert(slot.id) {
                    warn!(
                        "ignoring {} payload {:?}: slot holds {}",
                        slot.name, message.value, slot.kind
                    );
                }
            }
        }
        summary
    }

    pub fn unknown_ids(&self) -> usize {
        self.unknown.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::host::SimValue;
    use crate::registry::Registry;
    use crate::store::CanonicalStore;

    #[test]
    fn applies_known_and_skips_unknown() {
        let store = CanonicalStore::new(Arc::new(Registry::new().unwrap()));
        let mut ingest = Ingest::new();
        let messages = [
            SimMessage::named("Aircraft.Altitude", 3000.0),
            SimMessage::named("Aircraft.NearestAirportName", "Frankfurt"),
            SimMessage::new(42, SimValue::Double(1.0)),
            SimMessage::new(42, SimValue::Double(2.0)),
            SimMessage::named("Aircraft.Position", 5.0),
        ];

        let summary = store.write_tick(|w| ingest.apply(w, &messages));
        assert_eq!(
            summary,
            IngestSummary {
                applied: 2,
                unknown: 2,
                mismatched: 1
            }
        );
        assert_eq!(ingest.unknown_ids(), 1);

        let registry = Arc::clone(store.registry());
        let view = store.read();
        assert_eq!(view.scalar(registry.by_name("Aircraft.Altitude").unwrap()), 3000.0);
        assert_eq!(
            view.text(registry.by_name("Aircraft.NearestAirportName").unwrap()),
            "Frankfurt"
        );
    }
}
