//! Data-access strategies under measurement.
//!
//! Each strategy loads the complete employee set with addresses attached
//! from the store, differing only in how it shapes the SQL and assembles
//! the object graph. Every strategy must return exactly one record per
//! seeded employee; the repeater treats any other count as a fatal
//! measurement error.

use std::collections::HashMap;

use rusqlite::params;

use crate::store::{AddressRecord, EmployeeRecord, EmployeeStore};
use crate::{BenchError, BenchResult};

pub type Strategy = fn(&mut EmployeeStore) -> BenchResult<Vec<EmployeeRecord>>;

pub struct ScenarioDef {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Strategy,
}

/// Explicit scenario registry, resolved by name at startup. Adding a
/// strategy means adding a row here.
pub const SCENARIOS: &[ScenarioDef] = &[
    ScenarioDef {
        name: "join-dedup",
        description: "single LEFT JOIN, identity de-dup of root rows in first-seen order",
        run: join_dedup,
    },
    ScenarioDef {
        name: "join-ordered",
        description: "single JOIN ordered by employee id, grouping adjacent rows",
        run: join_ordered,
    },
    ScenarioDef {
        name: "two-query",
        description: "one query per table, merged in memory",
        run: two_query,
    },
    ScenarioDef {
        name: "per-employee",
        description: "employees first, then one address query per employee (N+1 baseline)",
        run: per_employee,
    },
];

pub fn find(name: &str) -> BenchResult<&'static ScenarioDef> {
    SCENARIOS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| BenchError::UnknownScenario(name.to_string()))
}

const JOIN_QUERY: &str = "SELECT e.id, e.first_name, e.last_name, e.phone_number,
        a.id, a.street_name, a.house_number
 FROM employee e
 LEFT JOIN address a ON a.employee_id = e.id";

/// One joined result set; the root entity repeats once per address row, so
/// roots are de-duplicated by identity, keeping first-seen order.
pub fn join_dedup(store: &mut EmployeeStore) -> BenchResult<Vec<EmployeeRecord>> {
    let mut stmt = store.conn.prepare_cached(JOIN_QUERY)?;
    let mut rows = stmt.query([])?;

    let mut employees: Vec<EmployeeRecord> = Vec::new();
    let mut seen: HashMap<i64, usize> = HashMap::new();

    while let Some(row) = rows.next()? {
        let employee_id: i64 = row.get(0)?;
        let slot = match seen.get(&employee_id) {
            Some(&slot) => slot,
            None => {
                employees.push(EmployeeRecord {
                    id: employee_id,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    phone_number: row.get(3)?,
                    addresses: Vec::new(),
                });
                let slot = employees.len() - 1;
                seen.insert(employee_id, slot);
                slot
            }
        };
        if let Some(address) = read_joined_address(row)? {
            employees[slot].addresses.push(address);
        }
    }

    Ok(employees)
}

/// Same join, but ordered by employee id so grouping needs only a
/// comparison with the previous root — no hash lookups.
pub fn join_ordered(store: &mut EmployeeStore) -> BenchResult<Vec<EmployeeRecord>> {
    let query = format!("{} ORDER BY e.id, a.id", JOIN_QUERY);
    let mut stmt = store.conn.prepare_cached(&query)?;
    let mut rows = stmt.query([])?;

    let mut employees: Vec<EmployeeRecord> = Vec::new();

    while let Some(row) = rows.next()? {
        let employee_id: i64 = row.get(0)?;
        if employees.last().map(|e| e.id) != Some(employee_id) {
            employees.push(EmployeeRecord {
                id: employee_id,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                phone_number: row.get(3)?,
                addresses: Vec::new(),
            });
        }
        if let Some(address) = read_joined_address(row)? {
            // last() just matched or was pushed
            if let Some(current) = employees.last_mut() {
                current.addresses.push(address);
            }
        }
    }

    Ok(employees)
}

/// Two full-table queries merged in memory: no row duplication on the
/// wire at the cost of a second round trip.
pub fn two_query(store: &mut EmployeeStore) -> BenchResult<Vec<EmployeeRecord>> {
    let mut employees: Vec<EmployeeRecord> = {
        let mut stmt = store.conn.prepare_cached(
            "SELECT id, first_name, last_name, phone_number FROM employee",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EmployeeRecord {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                phone_number: row.get(3)?,
                addresses: Vec::new(),
            })
        })?;
        rows.collect::<Result<_, _>>()?
    };

    let slots: HashMap<i64, usize> = employees
        .iter()
        .enumerate()
        .map(|(slot, e)| (e.id, slot))
        .collect();

    let mut stmt = store.conn.prepare_cached(
        "SELECT employee_id, id, street_name, house_number FROM address",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let employee_id: i64 = row.get(0)?;
        if let Some(&slot) = slots.get(&employee_id) {
            employees[slot].addresses.push(AddressRecord {
                id: row.get(1)?,
                street_name: row.get(2)?,
                house_number: row.get(3)?,
            });
        }
    }

    Ok(employees)
}

/// The N+1 shape: one query for the roots, then one prepared query per
/// root for its addresses.
pub fn per_employee(store: &mut EmployeeStore) -> BenchResult<Vec<EmployeeRecord>> {
    let mut employees: Vec<EmployeeRecord> = {
        let mut stmt = store.conn.prepare_cached(
            "SELECT id, first_name, last_name, phone_number FROM employee",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EmployeeRecord {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                phone_number: row.get(3)?,
                addresses: Vec::new(),
            })
        })?;
        rows.collect::<Result<_, _>>()?
    };

    let mut stmt = store.conn.prepare_cached(
        "SELECT id, street_name, house_number FROM address WHERE employee_id = ?1",
    )?;
    for employee in &mut employees {
        let rows = stmt.query_map(params![employee.id], |row| {
            Ok(AddressRecord {
                id: row.get(0)?,
                street_name: row.get(1)?,
                house_number: row.get(2)?,
            })
        })?;
        employee.addresses = rows.collect::<Result<_, _>>()?;
    }

    Ok(employees)
}

/// Address columns of a joined row; all NULL for employees without any
/// address (LEFT JOIN).
fn read_joined_address(row: &rusqlite::Row<'_>) -> BenchResult<Option<AddressRecord>> {
    let id: Option<i64> = row.get(4)?;
    Ok(match id {
        Some(id) => Some(AddressRecord {
            id,
            street_name: row.get(5)?,
            house_number: row.get(6)?,
        }),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> EmployeeStore {
        let mut store = EmployeeStore::open_in_memory().unwrap();
        store.seed(100, 2, 42).unwrap();
        store
    }

    fn normalized(mut records: Vec<EmployeeRecord>) -> Vec<EmployeeRecord> {
        records.sort_by_key(|e| e.id);
        for e in &mut records {
            e.addresses.sort_by_key(|a| a.id);
        }
        records
    }

    #[test]
    fn every_strategy_returns_the_full_dataset() {
        let mut store = seeded_store();
        for scenario in SCENARIOS {
            let records = (scenario.run)(&mut store).unwrap();
            assert_eq!(records.len(), 100, "{}", scenario.name);
            assert!(
                records.iter().all(|e| e.addresses.len() == 2),
                "{}",
                scenario.name
            );
        }
    }

    #[test]
    fn strategies_agree_on_the_object_graph() {
        let mut store = seeded_store();
        let baseline = normalized(per_employee(&mut store).unwrap());
        for scenario in SCENARIOS {
            let records = normalized((scenario.run)(&mut store).unwrap());
            assert_eq!(records, baseline, "{}", scenario.name);
        }
    }

    #[test]
    fn join_dedup_handles_employees_without_addresses() {
        let mut store = EmployeeStore::open_in_memory().unwrap();
        store.seed(3, 0, 42).unwrap();
        let records = join_dedup(&mut store).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|e| e.addresses.is_empty()));
    }

    #[test]
    fn registry_resolves_names_and_rejects_unknown() {
        assert_eq!(find("two-query").unwrap().name, "two-query");
        assert!(matches!(
            find("reflection-magic"),
            Err(BenchError::UnknownScenario(_))
        ));
    }
}
