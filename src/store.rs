//! Embedded document store on `fjall`
//!
//! Each collection is its own keyspace with records `postcard`-encoded under
//! `r/<id>`. Listing is a prefix scan, so records come back in key order;
//! marketplace ids are time-ordered, which makes that insertion order.
//! Writes that must land together go through a [`Batch`]. All fjall I/O runs
//! on the blocking pool.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fjall::{Database, Keyspace, KeyspaceCreateOptions};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tokio::task;

use crate::Result;
use crate::models::{Post, Product, User};

const RECORD_PREFIX: &str = "r/";

fn record_key(id: &str) -> Vec<u8> {
    format!("{RECORD_PREFIX}{id}").into_bytes()
}

fn read_bytes(keyspace: &Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(keyspace.get(key)?.map(|v| v.to_vec()))
}

/// Directory of a temporary store, removed once the last handle on it is gone
#[derive(Debug)]
struct ScratchDir(PathBuf);

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            tracing::debug!(path = %self.0.display(), "Could not remove scratch store: {}", e);
        }
    }
}

/// Typed handle on one keyspace. Clones share the writer lock.
pub struct Collection<T> {
    name: &'static str,
    keyspace: Keyspace,
    db: Database,
    writer: Arc<Mutex<()>>,
    // Dropped after the keyspace and database handles above
    _scratch: Option<Arc<ScratchDir>>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            keyspace: self.keyspace.clone(),
            db: self.db.clone(),
            writer: Arc::clone(&self.writer),
            _scratch: self._scratch.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    fn open(db: &Database, name: &'static str, scratch: Option<&Arc<ScratchDir>>) -> Result<Self> {
        let keyspace = db.keyspace(name, KeyspaceCreateOptions::default)?;
        Ok(Self {
            name,
            keyspace,
            db: db.clone(),
            writer: Arc::new(Mutex::new(())),
            _scratch: scratch.cloned(),
            _record: PhantomData,
        })
    }

    /// Empty batch on the database this collection lives in
    #[must_use]
    pub fn batch(&self) -> Batch {
        Batch {
            db: self.db.clone(),
            ops: Vec::new(),
        }
    }

    #[tracing::instrument(name = "store_get", level = "debug", skip(self), fields(collection = self.name))]
    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        let keyspace = self.keyspace.clone();
        let key = record_key(id);

        let maybe_bytes = task::spawn_blocking(move || read_bytes(&keyspace, &key)).await??;

        match maybe_bytes {
            Some(bytes) => Ok(Some(postcard::from_bytes(&bytes)?)),
            None => {
                tracing::debug!("Key not found");
                Ok(None)
            }
        }
    }

    /// Insert or replace a record
    #[tracing::instrument(name = "store_put", level = "debug", skip(self, record), fields(collection = self.name))]
    pub async fn put(&self, id: &str, record: &T) -> Result<()> {
        let bytes = postcard::to_stdvec(record)?;
        let keyspace = self.keyspace.clone();
        let key = record_key(id);

        task::spawn_blocking(move || keyspace.insert(key, bytes)).await??;
        Ok(())
    }

    /// Read-modify-write under the writer lock. Returns the updated record,
    /// or `None` when the id does not exist.
    #[tracing::instrument(name = "store_update", level = "debug", skip(self, apply), fields(collection = self.name))]
    pub async fn update<F>(&self, id: &str, apply: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut T) -> Result<()> + Send + 'static,
    {
        let keyspace = self.keyspace.clone();
        let key = record_key(id);

        let _guard = self.writer.lock().await;
        task::spawn_blocking(move || -> Result<Option<T>> {
            let Some(bytes) = read_bytes(&keyspace, &key)? else {
                return Ok(None);
            };
            let mut record: T = postcard::from_bytes(&bytes)?;
            apply(&mut record)?;
            keyspace.insert(key, postcard::to_stdvec(&record)?)?;
            Ok(Some(record))
        })
        .await?
    }

    /// Remove a record; `false` when it did not exist
    #[tracing::instrument(name = "store_remove", level = "debug", skip(self), fields(collection = self.name))]
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let keyspace = self.keyspace.clone();
        let key = record_key(id);

        let _guard = self.writer.lock().await;
        task::spawn_blocking(move || -> Result<bool> {
            if !keyspace.contains_key(&key)? {
                return Ok(false);
            }
            keyspace.remove(key)?;
            Ok(true)
        })
        .await?
    }

    /// Every record in key order
    #[tracing::instrument(name = "store_list", level = "debug", skip(self), fields(collection = self.name))]
    pub async fn list(&self) -> Result<Vec<T>> {
        let keyspace = self.keyspace.clone();

        task::spawn_blocking(move || -> Result<Vec<T>> {
            keyspace
                .prefix(RECORD_PREFIX)
                .map(|guard| -> Result<T> {
                    let (_, bytes) = guard.into_inner()?;
                    Ok(postcard::from_bytes(&bytes)?)
                })
                .collect()
        })
        .await?
    }
}

enum BatchOp {
    Insert(Keyspace, Vec<u8>, Vec<u8>),
    Remove(Keyspace, Vec<u8>),
}

/// Writes across one or more collections that commit atomically.
/// Dropping a batch without committing writes nothing.
#[must_use = "a batch does nothing until committed"]
pub struct Batch {
    db: Database,
    ops: Vec<BatchOp>,
}

impl Batch {
    pub fn put<T: Serialize>(&mut self, collection: &Collection<T>, id: &str, record: &T) -> Result<&mut Self> {
        let bytes = postcard::to_stdvec(record)?;
        self.ops
            .push(BatchOp::Insert(collection.keyspace.clone(), record_key(id), bytes));
        Ok(self)
    }

    pub fn remove<T>(&mut self, collection: &Collection<T>, id: &str) -> &mut Self {
        self.ops
            .push(BatchOp::Remove(collection.keyspace.clone(), record_key(id)));
        self
    }

    #[tracing::instrument(name = "store_commit", level = "debug", skip(self), fields(ops = self.ops.len()))]
    pub async fn commit(self) -> Result<()> {
        let Self { db, ops } = self;

        task::spawn_blocking(move || {
            let mut batch = db.batch();
            for op in ops {
                match op {
                    BatchOp::Insert(keyspace, key, value) => batch.insert(&keyspace, key, value),
                    BatchOp::Remove(keyspace, key) => batch.remove(&keyspace, key),
                };
            }
            batch.commit()
        })
        .await??;
        Ok(())
    }
}

/// All marketplace collections, opened once at startup
pub struct Store {
    pub users: Collection<User>,
    /// lowercase email -> user id
    pub user_emails: Collection<String>,
    /// username -> user id
    pub user_names: Collection<String>,
    pub products: Collection<Product>,
    pub posts: Collection<Post>,
    _db: Database,
    _scratch: Option<Arc<ScratchDir>>,
}

impl Store {
    #[tracing::instrument(skip_all)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_at(path.as_ref(), None)
    }

    fn open_at(path: &Path, scratch: Option<Arc<ScratchDir>>) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let db = Database::builder(path).open()?;
        let scratch_ref = scratch.as_ref();

        let store = Self {
            users: Collection::open(&db, "users", scratch_ref)?,
            user_emails: Collection::open(&db, "user_emails", scratch_ref)?,
            user_names: Collection::open(&db, "user_names", scratch_ref)?,
            products: Collection::open(&db, "products", scratch_ref)?,
            posts: Collection::open(&db, "posts", scratch_ref)?,
            _db: db,
            _scratch: scratch,
        };
        tracing::info!(path = %path.display(), "Opened store");
        Ok(store)
    }

    /// Throw-away store in the system temp dir. The directory is deleted when
    /// the store and every collection cloned from it have been dropped.
    pub fn temporary() -> Result<Self> {
        use rand::RngExt;
        let path = std::env::temp_dir()
            .join(format!("ontym-test-{:016x}", rand::rng().random::<u64>()));
        let scratch = Arc::new(ScratchDir(path.clone()));
        Self::open_at(&path, Some(scratch))
    }
}
