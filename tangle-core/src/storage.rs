//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `transactions` - Serialized transactions (key: raw transaction hash)
//!
//! The core only ever writes through [`TransactionStore::save`]; reads exist
//! for audit tooling and for restoring the graph on startup.

use crate::{
    error::{Error, Result},
    types::{Hash, Transaction},
    Config,
};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::sync::Arc;

/// Column family names
const CF_TRANSACTIONS: &str = "transactions";

/// Durable write boundary used by the ingestion pipeline
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist `value` under `key`
    async fn save(&self, key: &[u8], value: &[u8]) -> Result<()>;
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(
            CF_TRANSACTIONS,
            Self::cf_options_transactions(),
        )];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point lookups by hash benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Write one key/value pair
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    /// Write several pairs atomically
    pub fn put_batch(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let mut batch = WriteBatch::default();
        for (key, value) in entries {
            batch.put_cf(cf, key, value);
        }
        self.db.write(batch)?;
        Ok(())
    }

    /// Read raw bytes by key
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    /// Read a transaction by hash
    pub fn get_transaction(&self, hash: &Hash) -> Result<Option<Transaction>> {
        self.get(hash.as_bytes())?
            .map(|bytes| Transaction::from_bytes(&bytes))
            .transpose()
    }

    /// Load every stored transaction (unordered)
    pub fn load_transactions(&self) -> Result<Vec<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let mut transactions = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            transactions.push(Transaction::from_bytes(&value)?);
        }
        Ok(transactions)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_bytes;
    use crate::types::Submission;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    fn test_transaction(seed: &str) -> Transaction {
        Transaction::new(
            vec![],
            hash_bytes(seed.as_bytes()),
            &Submission::new("alice", "bob", seed),
        )
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        assert!(storage.db.cf_handle(CF_TRANSACTIONS).is_some());
    }

    #[test]
    fn test_put_and_get_transaction() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let tx = test_transaction("one");
        storage.put(tx.hash.as_bytes(), &tx.to_bytes().unwrap()).unwrap();

        let retrieved = storage.get_transaction(&tx.hash).unwrap().unwrap();
        assert_eq!(retrieved, tx);
        assert!(storage
            .get_transaction(&Hash::from_bytes([1u8; 32]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_put_batch_and_load() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let entries: Vec<(Vec<u8>, Vec<u8>)> = ["a", "b", "c"]
            .iter()
            .map(|seed| {
                let tx = test_transaction(seed);
                (tx.hash.as_bytes().to_vec(), tx.to_bytes().unwrap())
            })
            .collect();
        storage.put_batch(&entries).unwrap();

        assert_eq!(storage.load_transactions().unwrap().len(), 3);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let (config, _temp) = test_config();
        let tx = test_transaction("durable");
        {
            let storage = Storage::open(&config).unwrap();
            storage.put(tx.hash.as_bytes(), &tx.to_bytes().unwrap()).unwrap();
            storage.close().unwrap();
        }

        let storage = Storage::open(&config).unwrap();
        assert_eq!(storage.get_transaction(&tx.hash).unwrap(), Some(tx));
    }
}
