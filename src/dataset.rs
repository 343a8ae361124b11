//! Deterministic employee/address data generation (seeded via ChaCha8).

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::store::{AddressRecord, EmployeeRecord};

const STREETS: [&str; 6] = [
    "De Poorterstraat",
    "Vijverberg",
    "Stationsweg",
    "Kerkplein",
    "Molenlaan",
    "Dorpsstraat",
];

pub struct DataGen {
    rng: ChaCha8Rng,
}

impl DataGen {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Employee `id` with `addresses_per` child addresses. Address ids are
    /// derived from the employee id so reseeding stays collision-free.
    pub fn employee(&mut self, id: i64, addresses_per: usize) -> EmployeeRecord {
        let addresses = (0..addresses_per)
            .map(|slot| AddressRecord {
                id: id * addresses_per as i64 + slot as i64 + 1,
                street_name: format!(
                    "{} {}",
                    STREETS[self.rng.gen_range(0..STREETS.len())],
                    id
                ),
                house_number: self.rng.gen_range(1..500),
            })
            .collect();

        EmployeeRecord {
            id,
            first_name: format!("first-{:06}", id),
            last_name: format!("last-{:06}", id),
            phone_number: format!("06-{:08}", self.rng.gen_range(0..100_000_000u32)),
            addresses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_per_seed() {
        let mut a = DataGen::new(42);
        let mut b = DataGen::new(42);
        let ea = a.employee(7, 2);
        let eb = b.employee(7, 2);
        assert_eq!(ea.phone_number, eb.phone_number);
        assert_eq!(ea.addresses[0].street_name, eb.addresses[0].street_name);
    }

    #[test]
    fn address_ids_do_not_collide_across_employees() {
        let mut gen = DataGen::new(1);
        let e1 = gen.employee(1, 2);
        let e2 = gen.employee(2, 2);
        let ids: Vec<i64> = e1
            .addresses
            .iter()
            .chain(e2.addresses.iter())
            .map(|a| a.id)
            .collect();
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(ids.len(), unique.len());
    }
}
