use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::{CustomerId, FilmId};

type PairKey = (CustomerId, FilmId);

/// One async mutex per (customer, film) pair.
///
/// Slots are created on demand and dropped once nobody holds or waits on
/// them, so the table only grows with the number of pairs in flight.
#[derive(Debug, Default)]
pub(crate) struct PairLocks {
    slots: Mutex<HashMap<PairKey, Arc<AsyncMutex<()>>>>,
}

impl PairLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the pair. Released when the guard drops.
    pub(crate) async fn acquire(
        &self,
        customer_id: CustomerId,
        film_id: FilmId,
    ) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry((customer_id, film_id)).or_default())
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
