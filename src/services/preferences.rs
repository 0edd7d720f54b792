// Preferences
// Theme choice and the signed-in user record, kept in the local store.
// Sign-in itself belongs to an external identity provider.

use std::sync::Arc;

use super::local_store::{LocalStore, StoreError};
use crate::models::{Theme, User};

const THEME_KEY: &str = "theme_preference";
const USER_KEY: &str = "user_session";

pub struct Preferences {
    store: Arc<LocalStore>,
}

impl Preferences {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    /// `None` means follow the system setting.
    pub fn theme(&self) -> Result<Option<Theme>, StoreError> {
        self.store.get(THEME_KEY)
    }

    pub fn set_theme(&self, theme: Option<Theme>) -> Result<(), StoreError> {
        match theme {
            Some(t) => self.store.set(THEME_KEY, &t),
            None => self.store.remove(THEME_KEY).map(|_| ()),
        }
    }

    pub fn user(&self) -> Result<Option<User>, StoreError> {
        self.store.get(USER_KEY)
    }

    pub fn set_user(&self, user: &User) -> Result<(), StoreError> {
        self.store.set(USER_KEY, user)
    }

    pub fn clear_user(&self) -> Result<(), StoreError> {
        self.store.remove(USER_KEY).map(|_| ())
    }
}
