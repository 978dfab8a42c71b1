//! CRUD operations for [`Group`] records and the group message log.

use rusqlite::{params, Transaction};
use uuid::Uuid;

use parley_shared::{Address, GroupId};

use crate::chats::row_to_message;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Group, Message};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a group and all of its membership rows in one transaction.
    ///
    /// Either the group and every member row land, or none of it does.
    pub fn insert_group(&mut self, group: &Group) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        insert_group_tx(&tx, group)?;
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single group with its member list.
    pub fn get_group(&self, id: GroupId) -> Result<Group> {
        let (name, description, admin) = self
            .conn()
            .query_row(
                "SELECT name, description, admin FROM groups WHERE id = ?1",
                params![id.0.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;

        Ok(Group {
            id,
            name,
            description,
            members: self.group_member_list(id)?,
            admin: Address::from_hex(&admin)?,
        })
    }

    /// List every group.  Used to rebuild the in-memory directory.
    pub fn list_groups(&self) -> Result<Vec<Group>> {
        let mut stmt = self.conn().prepare("SELECT id FROM groups")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut groups = Vec::new();
        for row in rows {
            let id = GroupId(Uuid::parse_str(&row?)?);
            groups.push(self.get_group(id)?);
        }
        Ok(groups)
    }

    fn group_member_list(&self, id: GroupId) -> Result<Vec<Address>> {
        let mut stmt = self.conn().prepare(
            "SELECT member FROM group_members WHERE group_id = ?1 ORDER BY pos ASC",
        )?;
        let rows = stmt.query_map(params![id.0.to_string()], |row| row.get::<_, String>(0))?;

        let mut members = Vec::new();
        for row in rows {
            members.push(Address::from_hex(&row?)?);
        }
        Ok(members)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace the group admin.  The new admin need not be a member.
    pub fn update_group_admin(&self, id: GroupId, admin: Address) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE groups SET admin = ?2 WHERE id = ?1",
            params![id.0.to_string(), admin.to_hex()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Remove one membership row.  Returns `true` if the member was present.
    pub fn remove_group_member(&self, id: GroupId, member: Address) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND member = ?2",
            params![id.0.to_string(), member.to_hex()],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Append a message at the given index of the group log.
    pub fn append_group_message(
        &self,
        id: GroupId,
        seq: usize,
        message: &Message,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO group_messages
                 (group_id, seq, sender, content, created_at, is_read, is_deleted, is_media)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.0.to_string(),
                seq as i64,
                message.sender.to_hex(),
                message.content,
                message.created_at.to_rfc3339(),
                message.is_read,
                message.is_deleted,
                message.is_media,
            ],
        )?;
        Ok(())
    }

    /// Full ordered message sequence for one group.
    pub fn group_messages(&self, id: GroupId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT sender, content, created_at, is_read, is_deleted, is_media
             FROM group_messages
             WHERE group_id = ?1
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![id.0.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_group_tx(tx: &Transaction<'_>, group: &Group) -> Result<()> {
    tx.execute(
        "INSERT INTO groups (id, name, description, admin) VALUES (?1, ?2, ?3, ?4)",
        params![
            group.id.0.to_string(),
            group.name,
            group.description,
            group.admin.to_hex(),
        ],
    )?;

    for (pos, member) in group.members.iter().enumerate() {
        tx.execute(
            "INSERT INTO group_members (group_id, member, pos) VALUES (?1, ?2, ?3)",
            params![group.id.0.to_string(), member.to_hex(), pos as i64],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_shared::constants::ADDRESS_SIZE;

    fn addr(byte: u8) -> Address {
        Address([byte; ADDRESS_SIZE])
    }

    fn sample_group() -> Group {
        Group {
            id: GroupId::new(),
            name: "Friends".into(),
            description: "A group for friends".into(),
            members: vec![addr(1), addr(2), addr(3)],
            admin: addr(1),
        }
    }

    #[test]
    fn insert_get_round_trip() {
        let mut db = Database::open_in_memory().unwrap();
        let group = sample_group();

        db.insert_group(&group).unwrap();
        let got = db.get_group(group.id).unwrap();
        assert_eq!(got, group);
    }

    #[test]
    fn member_order_is_preserved() {
        let mut db = Database::open_in_memory().unwrap();
        let mut group = sample_group();
        group.members = vec![addr(9), addr(3), addr(5)];

        db.insert_group(&group).unwrap();
        assert_eq!(db.get_group(group.id).unwrap().members, group.members);
    }

    #[test]
    fn admin_update_and_member_removal() {
        let mut db = Database::open_in_memory().unwrap();
        let group = sample_group();
        db.insert_group(&group).unwrap();

        db.update_group_admin(group.id, addr(7)).unwrap();
        assert!(db.remove_group_member(group.id, addr(2)).unwrap());
        assert!(!db.remove_group_member(group.id, addr(2)).unwrap());

        let got = db.get_group(group.id).unwrap();
        assert_eq!(got.admin, addr(7));
        assert_eq!(got.members, vec![addr(1), addr(3)]);
    }

    #[test]
    fn missing_group_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.get_group(GroupId::new()).unwrap_err(),
            StoreError::NotFound
        ));
    }

    #[test]
    fn group_log_round_trip() {
        let mut db = Database::open_in_memory().unwrap();
        let group = sample_group();
        db.insert_group(&group).unwrap();

        let m = Message::new(addr(1), "Hello, everyone!".into(), Utc::now(), false);
        db.append_group_message(group.id, 0, &m).unwrap();

        let messages = db.group_messages(group.id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, addr(1));
        assert_eq!(messages[0].content, "Hello, everyone!");
    }
}
