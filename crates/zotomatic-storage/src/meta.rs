use rusqlite::{params, OptionalExtension};

use crate::{StateStore, StorageError};

impl StateStore {
    pub fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    /// Atomically adds `delta` to the integer counter stored at `key`
    /// (treating a missing key as zero) and returns the new total. Used by
    /// the LLM usage ledger (`spec.md` §4.5) to reserve call budget without
    /// a read-then-write race between concurrent callers.
    pub fn add_meta_counter(&self, key: &str, delta: i64) -> Result<i64, StorageError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let current: i64 = tx
                .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let updated = current + delta;
            tx.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, updated.to_string()],
            )?;
            tx.commit()?;
            Ok(updated)
        })
    }

    /// Atomically adds `delta` to the counter at `key` only if the result
    /// would not exceed `cap`, returning whether the reservation succeeded.
    /// A non-positive `cap` is treated as "no limit" and always succeeds.
    /// This is the primitive behind [`crate::StateStore`]'s use from the LLM
    /// usage ledger's `try_reserve` (`spec.md` §4.5): the check and the
    /// increment happen inside one transaction, so two callers racing to
    /// reserve the last unit of quota can't both succeed.
    pub fn try_add_meta_counter_capped(
        &self,
        key: &str,
        delta: i64,
        cap: i64,
    ) -> Result<bool, StorageError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let current: i64 = tx
                .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let updated = current + delta;
            if cap > 0 && updated > cap {
                tx.commit()?;
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, updated.to_string()],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_meta_key_is_none() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get_meta("boot_seed_complete").unwrap().is_none());
    }

    #[test]
    fn set_then_get_meta_round_trips() {
        let store = StateStore::open_in_memory().unwrap();
        store.set_meta("boot_seed_complete", "true").unwrap();
        assert_eq!(store.get_meta("boot_seed_complete").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn add_meta_counter_starts_from_zero() {
        let store = StateStore::open_in_memory().unwrap();
        let total = store.add_meta_counter("llm_usage.2026-07-28", 3).unwrap();
        assert_eq!(total, 3);
    }

    #[test]
    fn add_meta_counter_accumulates() {
        let store = StateStore::open_in_memory().unwrap();
        store.add_meta_counter("llm_usage.2026-07-28", 3).unwrap();
        let total = store.add_meta_counter("llm_usage.2026-07-28", 2).unwrap();
        assert_eq!(total, 5);
    }

    #[test]
    fn try_add_meta_counter_capped_allows_up_to_the_cap() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.try_add_meta_counter_capped("llm_usage.2026-07-28", 5, 5).unwrap());
        assert_eq!(store.get_meta("llm_usage.2026-07-28").unwrap().as_deref(), Some("5"));
    }

    #[test]
    fn try_add_meta_counter_capped_rejects_over_the_cap_without_mutating() {
        let store = StateStore::open_in_memory().unwrap();
        store.try_add_meta_counter_capped("llm_usage.2026-07-28", 4, 5).unwrap();
        assert!(!store.try_add_meta_counter_capped("llm_usage.2026-07-28", 2, 5).unwrap());
        assert_eq!(store.get_meta("llm_usage.2026-07-28").unwrap().as_deref(), Some("4"));
    }

    #[test]
    fn try_add_meta_counter_capped_treats_zero_cap_as_unlimited() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.try_add_meta_counter_capped("llm_usage.2026-07-28", 1000, 0).unwrap());
    }
}
