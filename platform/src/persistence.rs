use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A persisted account, as `spec.md` §6's "Persistent state layout"
/// describes: an `account`/`user` document keyed by `uid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub uid: String,
    pub platform_id: String,
    pub nickname: String,
    pub gold: i64,
}

/// Document-store + key-value-counter contract. The counter models
/// `MSQP:AccountId`, seeded at 10000 and incremented atomically to allocate
/// new `uid`s. No networked implementation lives in this workspace; the
/// in-memory one below backs the gate-contract tests only.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_uid(&self, uid: &str) -> Result<Option<Account>, Error>;
    async fn create(&self, account: Account) -> Result<(), Error>;
    async fn allocate_uid(&self) -> Result<String, Error>;
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    use super::*;

    const ACCOUNT_ID_SEED: i64 = 10000;

    pub struct InMemoryAccountStore {
        accounts: Mutex<HashMap<String, Account>>,
        next_id: AtomicI64,
    }

    impl Default for InMemoryAccountStore {
        fn default() -> Self {
            Self {
                accounts: Mutex::new(HashMap::new()),
                next_id: AtomicI64::new(ACCOUNT_ID_SEED),
            }
        }
    }

    #[async_trait]
    impl AccountStore for InMemoryAccountStore {
        async fn find_by_uid(&self, uid: &str) -> Result<Option<Account>, Error> {
            Ok(self.accounts.lock().unwrap().get(uid).cloned())
        }

        async fn create(&self, account: Account) -> Result<(), Error> {
            self.accounts.lock().unwrap().insert(account.uid.clone(), account);
            Ok(())
        }

        async fn allocate_uid(&self) -> Result<String, Error> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(id.to_string())
        }
    }

    #[tokio::test]
    async fn allocates_sequential_uids_from_seed() {
        let store = InMemoryAccountStore::default();
        assert_eq!(store.allocate_uid().await.unwrap(), "10000");
        assert_eq!(store.allocate_uid().await.unwrap(), "10001");
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let store = InMemoryAccountStore::default();
        let account = Account {
            uid: "10000".into(),
            platform_id: "wx-1".into(),
            nickname: "a".into(),
            gold: 0,
        };
        store.create(account.clone()).await.unwrap();
        let found = store.find_by_uid("10000").await.unwrap().unwrap();
        assert_eq!(found.nickname, "a");
    }
}
