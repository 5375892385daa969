//! Contact service: each user's address book of other users.

use std::sync::Arc;

use tracing::info;

use crate::conflict::{insert_with_retry, storage_failure};
use crate::entities::{Contact, ContactId, NewContact, UserId};
use crate::error::{MessengerError, MessengerResult};
use crate::ids::IdGenerator;
use crate::store::ContactStore;
use crate::utils::validate_search;

pub struct ContactService<S> {
    store: Arc<S>,
    ids: Arc<dyn IdGenerator>,
    max_insert_attempts: u32,
}

impl<S: ContactStore> ContactService<S> {
    pub fn new(store: Arc<S>, ids: Arc<dyn IdGenerator>, max_insert_attempts: u32) -> Self {
        Self {
            store,
            ids,
            max_insert_attempts,
        }
    }

    /// Add `recipient_id` to the owner's contacts.
    ///
    /// Both users must exist. Adding the same recipient twice fails with
    /// [`MessengerError::AlreadyExists`].
    pub async fn add_contact(&self, request: NewContact) -> MessengerResult<Contact> {
        if request.owner_id == request.recipient_id {
            return Err(MessengerError::invalid_input(
                "a user cannot add themselves as a contact",
            ));
        }

        let store = &self.store;
        let request = &request;
        let contact = insert_with_retry(self.ids.as_ref(), self.max_insert_attempts, |id| async move {
            store.insert_contact(id, request).await
        })
        .await?;

        info!(
            contact_id = %contact.id,
            owner_id = %contact.owner_id,
            recipient_id = %contact.recipient_id,
            "contact added"
        );
        Ok(contact)
    }

    pub async fn get_contact(&self, id: ContactId) -> MessengerResult<Contact> {
        self.store
            .find_contact(id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| MessengerError::not_found("contact", id))
    }

    pub async fn list_contacts(&self, owner: UserId) -> MessengerResult<Vec<Contact>> {
        self.store.list_contacts(owner).await.map_err(storage_failure)
    }

    /// The owner's contacts whose recipient matches `query` by username or
    /// email. Empty when none match.
    pub async fn search_contacts(&self, owner: UserId, query: &str) -> MessengerResult<Vec<Contact>> {
        let query = validate_search(query)?;
        self.store
            .search_contacts(owner, query)
            .await
            .map_err(storage_failure)
    }

    pub async fn remove_contact(&self, id: ContactId) -> MessengerResult<()> {
        if !self.store.delete_contact(id).await.map_err(storage_failure)? {
            return Err(MessengerError::not_found("contact", id));
        }
        info!(contact_id = %id, "contact removed");
        Ok(())
    }
}
