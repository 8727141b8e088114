use tracing::warn;

use crate::error::StoreError;
use crate::traits::{EntityStore, StoreTransaction};

/// Run `f` inside one store transaction.
///
/// Commits when `f` returns `Ok`, rolls back when it returns `Err`. Code
/// called from `f` that needs the same atomic scope takes the
/// `&mut dyn StoreTransaction` it was given rather than opening another.
pub fn with_transaction<S, T, E, F>(store: &S, f: F) -> Result<T, E>
where
    S: EntityStore + ?Sized,
    E: From<StoreError> + std::fmt::Display,
    F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
{
    let mut tx = store.begin()?;
    match f(tx.as_mut()) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            drop(tx);
            warn!(error = %err, "transaction rolled back");
            Err(err)
        }
    }
}
