//! Application-facing data access for users.
//!
//! [`DataStore`] hides where users come from. The ORM-backed store reports an
//! absent user as `Ok(None)` rather than a not-found error.

use crate::error::{Error, Result, ResultExt};
use crate::repository::Repository;

crate::model! {
    /// Sample model stored in the `user` table.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct User {
        #[pk]
        pub id: i64,
        pub name: String,
        pub age: i64,
    }
}

pub trait DataStore {
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    fn save_user(&self, user: &User) -> Result<()>;
    fn delete_user(&self, id: i64) -> Result<()>;
}

/// [`DataStore`] over a [`Repository`].
pub struct OrmDataStore<R> {
    repo: Option<R>,
}

impl<R: Repository> OrmDataStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo: Some(repo) }
    }

    /// A store with no repository behind it; every call fails with
    /// [`Error::NilRepository`].
    pub fn without_repository() -> Self {
        Self { repo: None }
    }

    fn repo(&self) -> Result<&R> {
        self.repo.as_ref().ok_or(Error::NilRepository)
    }
}

impl<R: Repository> DataStore for OrmDataStore<R> {
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let repo = self.repo()?;
        let mut user = User::default();
        match repo.find_by_id(&mut user, id) {
            Ok(()) => Ok(Some(user)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.context(format!("failed to find user by id {id}"))),
        }
    }

    fn save_user(&self, user: &User) -> Result<()> {
        self.repo()?.save(user).context("failed to save user")?;
        Ok(())
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        let user = User {
            id,
            ..User::default()
        };
        self.repo()?
            .delete(&user)
            .map_err(|e| e.context(format!("failed to delete user with id {id}")))?;
        Ok(())
    }
}

/// Stand-in for a remote user service.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApiDataStore;

impl ApiDataStore {
    fn not_implemented(what: &str) -> Error {
        Error::Unsupported(format!("API not implemented: {what}"))
    }
}

impl DataStore for ApiDataStore {
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        if id == 1 {
            return Ok(Some(User {
                id: 1,
                name: "Mock API User".to_string(),
                age: 30,
            }));
        }
        Err(Self::not_implemented("user not found"))
    }

    fn save_user(&self, _user: &User) -> Result<()> {
        Err(Self::not_implemented("cannot save user"))
    }

    fn delete_user(&self, _id: i64) -> Result<()> {
        Err(Self::not_implemented("cannot delete user"))
    }
}
