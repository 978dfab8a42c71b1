//! CRUD operations for [`Participant`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;

use parley_shared::Address;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Participant;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new participant profile.
    pub fn insert_participant(&self, participant: &Participant) -> Result<()> {
        self.conn().execute(
            "INSERT INTO participants (address, name, status, status_expiry, profile_picture)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                participant.address.to_hex(),
                participant.name,
                participant.status,
                participant.status_expiry.to_rfc3339(),
                participant.profile_picture,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single participant by address.
    pub fn get_participant(&self, address: Address) -> Result<Participant> {
        self.conn()
            .query_row(
                "SELECT address, name, status, status_expiry, profile_picture
                 FROM participants
                 WHERE address = ?1",
                params![address.to_hex()],
                row_to_participant,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Whether a participant row exists.  Total, never fails on absence.
    pub fn participant_exists(&self, address: Address) -> Result<bool> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM participants WHERE address = ?1",
            params![address.to_hex()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all participants.  Used to rebuild the in-memory registry.
    pub fn list_participants(&self) -> Result<Vec<Participant>> {
        let mut stmt = self.conn().prepare(
            "SELECT address, name, status, status_expiry, profile_picture
             FROM participants",
        )?;

        let rows = stmt.query_map([], row_to_participant)?;

        let mut participants = Vec::new();
        for row in rows {
            participants.push(row?);
        }
        Ok(participants)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update the status text and its absolute expiry.
    pub fn update_participant_status(
        &self,
        address: Address,
        status: &str,
        expiry: DateTime<Utc>,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE participants SET status = ?2, status_expiry = ?3 WHERE address = ?1",
            params![address.to_hex(), status, expiry.to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Update the profile picture URL.
    pub fn update_participant_picture(&self, address: Address, url: &str) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE participants SET profile_picture = ?2 WHERE address = ?1",
            params![address.to_hex(), url],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Remove a profile entirely.  Returns `true` if a row was deleted.
    /// Message history keyed by the address value is untouched.
    pub fn delete_participant(&self, address: Address) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM participants WHERE address = ?1",
            params![address.to_hex()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Participant`].
fn row_to_participant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Participant> {
    let address_hex: String = row.get(0)?;
    let name: String = row.get(1)?;
    let status: String = row.get(2)?;
    let expiry_str: String = row.get(3)?;
    let profile_picture: String = row.get(4)?;

    let address = Address::from_hex(&address_hex).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status_expiry: DateTime<Utc> = DateTime::parse_from_rfc3339(&expiry_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Participant {
        address,
        name,
        status,
        status_expiry,
        profile_picture,
    })
}
