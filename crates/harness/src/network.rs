use std::path::PathBuf;

use tempfile::TempDir;

use findprice_engine::EngineError;
use findprice_storage::{SqliteStore, StorageError};

use crate::TestClient;

const DATABASE_FILE: &str = "catalog.db";

/// Several clients connected to one shared store, the way several browsers
/// share one realtime database.
pub struct TestNetwork {
    store: SqliteStore,
    clients: Vec<TestClient>,
    dir: Option<TempDir>,
}

impl TestNetwork {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            store: SqliteStore::open_in_memory()?,
            clients: Vec::new(),
            dir: None,
        })
    }

    /// Same as [`TestNetwork::new`], but the store lives in a temporary file
    /// that is removed with the network.
    pub fn on_disk() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = SqliteStore::open(dir.path().join(DATABASE_FILE))?;
        Ok(Self {
            store,
            clients: Vec::new(),
            dir: Some(dir),
        })
    }

    pub fn database_file(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.path().join(DATABASE_FILE))
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn add_client(&mut self) -> Result<usize, EngineError> {
        let client = TestClient::connect(self.store.clone())?;
        let index = self.clients.len();
        self.clients.push(client);
        Ok(index)
    }

    pub fn client(&self, index: usize) -> &TestClient {
        &self.clients[index]
    }

    pub fn client_mut(&mut self, index: usize) -> &mut TestClient {
        &mut self.clients[index]
    }

    /// Disconnects a client, releasing its subscriptions.
    pub fn remove_client(&mut self, index: usize) -> TestClient {
        self.clients.remove(index)
    }
}
