//! User service for registration, lookup, profile updates and search.

use std::sync::Arc;

use tracing::info;

use crate::conflict::{insert_with_retry, storage_failure};
use crate::entities::{NewUser, NewUserRecord, User, UserId, UserUpdate};
use crate::error::{MessengerError, MessengerResult};
use crate::ids::IdGenerator;
use crate::store::UserStore;
use crate::utils::{
    hash_password, validate_email, validate_password, validate_search, validate_username,
};

/// Upper bound on users returned by one search.
pub const USER_SEARCH_LIMIT: u32 = 50;

/// Service for managing user operations
pub struct UserService<S> {
    store: Arc<S>,
    ids: Arc<dyn IdGenerator>,
    max_insert_attempts: u32,
}

impl<S: UserStore> UserService<S> {
    pub fn new(store: Arc<S>, ids: Arc<dyn IdGenerator>, max_insert_attempts: u32) -> Self {
        Self {
            store,
            ids,
            max_insert_attempts,
        }
    }

    /// Register a new user.
    ///
    /// Duplicate usernames or emails fail with [`MessengerError::AlreadyExists`]
    /// after a single attempt; identifier collisions are retried.
    pub async fn create_user(&self, request: NewUser) -> MessengerResult<User> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();

        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&request.password)?;

        let record = NewUserRecord {
            username,
            email,
            password_hash: hash_password(&request.password)?,
        };

        let store = &self.store;
        let record = &record;
        let user = insert_with_retry(self.ids.as_ref(), self.max_insert_attempts, |id| async move {
            store.insert_user(id, record).await
        })
        .await?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: UserId) -> MessengerResult<User> {
        self.store
            .find_user(user_id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| MessengerError::not_found("user", user_id))
    }

    /// Replace a user's username and email, with the same normalisation and
    /// validation as registration.
    pub async fn update_user(&self, user_id: UserId, update: UserUpdate) -> MessengerResult<User> {
        let update = UserUpdate {
            username: update.username.trim().to_string(),
            email: update.email.trim().to_lowercase(),
        };
        validate_username(&update.username)?;
        validate_email(&update.email)?;

        let user = self
            .store
            .update_user(user_id, &update)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| MessengerError::not_found("user", user_id))?;

        info!(user_id = %user.id, username = %user.username, "user updated");
        Ok(user)
    }

    /// Users whose username or email contains `query`. Empty when none match.
    pub async fn search_users(&self, query: &str) -> MessengerResult<Vec<User>> {
        let query = validate_search(query)?;
        self.store
            .search_users(query, USER_SEARCH_LIMIT)
            .await
            .map_err(storage_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryStore, SequenceIds};
    use crate::utils::verify_password;
    use uuid::Uuid;

    fn service() -> (Arc<MemoryStore>, UserService<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let service = UserService::new(store.clone(), Arc::new(SequenceIds::new()), 5);
        (store, service)
    }

    fn request(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "s3cret-passw0rd".to_string(),
        }
    }

    #[tokio::test]
    async fn create_user_hashes_password_and_normalises_email() {
        let (_store, service) = service();

        let user = service
            .create_user(request(" alice ", "Alice@Example.com"))
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_ne!(user.password_hash, "s3cret-passw0rd");
        assert!(verify_password("s3cret-passw0rd", &user.password_hash).unwrap());

        let fetched = service.get_user(user.id).await.unwrap();
        assert_eq!(fetched.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_already_exists() {
        let (_store, service) = service();
        service
            .create_user(request("alice", "alice@example.com"))
            .await
            .unwrap();

        let error = service
            .create_user(request("alicia", "alice@example.com"))
            .await
            .expect_err("duplicate email");

        assert!(matches!(
            error,
            MessengerError::AlreadyExists { ref constraint } if constraint == "users.email"
        ));
    }

    #[tokio::test]
    async fn identifier_collision_is_retried() {
        let (store, service) = service();
        store.fail_next_inserts_with_collision(2);

        let user = service
            .create_user(request("bob", "bob@example.com"))
            .await
            .unwrap();

        assert_eq!(user.id, Uuid::from_u128(3));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_store() {
        let (store, service) = service();
        store.fail_next_inserts_with_broken_storage(1);

        let error = service
            .create_user(request("x", "x@example.com"))
            .await
            .expect_err("short username");
        assert!(matches!(error, MessengerError::InvalidInput { .. }));

        // The queued failure is still pending, so the store was never called.
        let error = service
            .create_user(request("carol", "carol@example.com"))
            .await
            .expect_err("queued storage failure");
        assert!(matches!(error, MessengerError::Fatal { .. }));
    }

    #[tokio::test]
    async fn update_replaces_profile_and_stamps_updated_at() {
        let (_store, service) = service();
        let user = service
            .create_user(request("alice", "alice@example.com"))
            .await
            .unwrap();

        let updated = service
            .update_user(
                user.id,
                UserUpdate {
                    username: " alice_b ".to_string(),
                    email: "Alice.B@Example.com".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, user.id);
        assert_eq!(updated.username, "alice_b");
        assert_eq!(updated.email, "alice.b@example.com");
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.password_hash, user.password_hash);
        assert_eq!(service.get_user(user.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_to_a_taken_username_is_already_exists() {
        let (_store, service) = service();
        service
            .create_user(request("alice", "alice@example.com"))
            .await
            .unwrap();
        let bob = service
            .create_user(request("bob", "bob@example.com"))
            .await
            .unwrap();

        let error = service
            .update_user(
                bob.id,
                UserUpdate {
                    username: "alice".to_string(),
                    email: "bob@example.com".to_string(),
                },
            )
            .await
            .expect_err("username taken");

        assert!(matches!(
            error,
            MessengerError::AlreadyExists { ref constraint } if constraint == "users.username"
        ));
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_not_found() {
        let (_store, service) = service();

        let error = service
            .update_user(
                Uuid::new_v4(),
                UserUpdate {
                    username: "ghost".to_string(),
                    email: "ghost@example.com".to_string(),
                },
            )
            .await
            .expect_err("unknown user");
        assert!(matches!(error, MessengerError::NotFound { entity: "user", .. }));

        let error = service
            .update_user(
                Uuid::new_v4(),
                UserUpdate {
                    username: "g".to_string(),
                    email: "ghost@example.com".to_string(),
                },
            )
            .await
            .expect_err("invalid username");
        assert!(matches!(error, MessengerError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn search_matches_username_or_email_ignoring_case() {
        let (_store, service) = service();
        for (username, email) in [
            ("alice", "alice@example.com"),
            ("bob", "bob@wonderland.org"),
            ("carol", "carol@example.com"),
        ] {
            service.create_user(request(username, email)).await.unwrap();
        }

        let names = |users: Vec<User>| users.into_iter().map(|u| u.username).collect::<Vec<_>>();
        assert_eq!(names(service.search_users("ALI").await.unwrap()), vec!["alice"]);
        assert_eq!(names(service.search_users("wonder").await.unwrap()), vec!["bob"]);
        assert_eq!(
            names(service.search_users("example").await.unwrap()),
            vec!["alice", "carol"]
        );
        assert!(service.search_users("zed").await.unwrap().is_empty());

        let error = service.search_users("  ").await.expect_err("blank term");
        assert!(matches!(error, MessengerError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (_store, service) = service();

        let error = service.get_user(Uuid::new_v4()).await.expect_err("unknown");
        assert!(matches!(error, MessengerError::NotFound { entity: "user", .. }));
    }
}
