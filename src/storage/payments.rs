use redb::ReadableTable;

use super::db::{self, Database, DatabaseError};
use super::models::Payment;
use super::tables::*;

impl Database {
    // ========================================================================
    // Payment operations
    // ========================================================================

    /// Record a payment unless its order or capture id is already known.
    /// Returns the stored payment: the new one, or the one recorded earlier.
    pub fn record_payment(&self, payment: &Payment) -> Result<(Payment, bool), DatabaseError> {
        let write_txn = self.begin_write()?;

        let mut refs = vec![payment.order_id.as_str()];
        if let Some(ref capture_id) = payment.capture_id {
            refs.push(capture_id.as_str());
        }

        let mut existing: Option<Payment> = None;
        for reference in &refs {
            let existing_id = {
                let table = write_txn.open_table(PAYMENT_REFS)?;
                let result = table.get(*reference)?.map(|v| v.value().to_string());
                result
            };
            if let Some(existing_id) = existing_id {
                existing = db::load_doc(&write_txn, PAYMENTS, &existing_id)?;
                if existing.is_some() {
                    break;
                }
            }
        }
        if let Some(existing) = existing {
            write_txn.abort()?;
            return Ok((existing, false));
        }

        db::store_doc(&write_txn, PAYMENTS, &payment.id, payment)?;
        for reference in refs {
            db::key_insert(&write_txn, PAYMENT_REFS, reference, &payment.id)?;
        }
        write_txn.commit()?;
        Ok((payment.clone(), true))
    }

    /// Find a payment by gateway order id or capture id.
    pub fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, DatabaseError> {
        match self.lookup_key(PAYMENT_REFS, reference)? {
            Some(id) => self.get_doc(PAYMENTS, &id),
            None => Ok(None),
        }
    }

    /// Payments newest first, optionally restricted to one user.
    pub fn list_payments(&self, user_id: Option<&str>) -> Result<Vec<Payment>, DatabaseError> {
        let mut payments: Vec<Payment> = self
            .all_docs::<Payment>(PAYMENTS)?
            .into_iter()
            .filter(|p| user_id.map_or(true, |u| p.user_id == u))
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}
