//! SQLite-backed employee store: schema, pragmas and deterministic seeding.
//!
//! Configuration: WAL mode, NORMAL synchronous for file-backed stores.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::dataset::DataGen;
use crate::BenchResult;

/// Root entity of the benchmark dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub addresses: Vec<AddressRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressRecord {
    pub id: i64,
    pub street_name: String,
    pub house_number: i64,
}

pub struct EmployeeStore {
    pub(crate) conn: Connection,
}

impl EmployeeStore {
    /// Open (or create) a file-backed store tuned for read throughput.
    pub fn open(path: &Path) -> BenchResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;",
        )?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> BenchResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> BenchResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS employee (
                id           INTEGER PRIMARY KEY,
                first_name   TEXT NOT NULL,
                last_name    TEXT NOT NULL,
                phone_number TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS address (
                id           INTEGER PRIMARY KEY,
                employee_id  INTEGER NOT NULL REFERENCES employee(id),
                street_name  TEXT NOT NULL,
                house_number INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_address_employee ON address(employee_id);",
        )?;
        Ok(())
    }

    pub fn employee_count(&self) -> BenchResult<usize> {
        let count: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM employee", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Replace the dataset with `employees` deterministic records carrying
    /// `addresses_per` addresses each. One transaction, cached statements.
    pub fn seed(&mut self, employees: usize, addresses_per: usize, seed: u64) -> BenchResult<()> {
        let mut gen = DataGen::new(seed);
        let tx = self.conn.transaction()?;
        {
            tx.execute_batch("DELETE FROM address; DELETE FROM employee;")?;
            let mut insert_employee = tx.prepare_cached(
                "INSERT INTO employee (id, first_name, last_name, phone_number)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut insert_address = tx.prepare_cached(
                "INSERT INTO address (id, employee_id, street_name, house_number)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for id in 1..=employees as i64 {
                let employee = gen.employee(id, addresses_per);
                insert_employee.execute(params![
                    employee.id,
                    employee.first_name,
                    employee.last_name,
                    employee.phone_number
                ])?;
                for address in &employee.addresses {
                    insert_address.execute(params![
                        address.id,
                        employee.id,
                        address.street_name,
                        address.house_number
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Seed only if the current dataset does not already hold exactly
    /// `employees` rows.
    pub fn ensure_seeded(
        &mut self,
        employees: usize,
        addresses_per: usize,
        seed: u64,
    ) -> BenchResult<()> {
        let current = self.employee_count()?;
        if current == employees {
            tracing::info!(employees, "store already seeded");
            return Ok(());
        }
        tracing::info!(current, employees, "reseeding store");
        self.seed(employees, addresses_per, seed)
    }
}
