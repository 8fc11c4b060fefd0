use reqwest::Method;
use shared::{
    domain::UserId,
    protocol::{RegisterRequest, User, UserUpdateRequest},
};

use crate::{error::Result, transport::ApiClient};

impl ApiClient {
    pub async fn get_user(&self, bearer: Option<&str>, user_id: &UserId) -> Result<User> {
        self.get_json(self.endpoint(&["api", "users", user_id.as_str()]), bearer)
            .await
    }

    pub async fn update_user(
        &self,
        bearer: Option<&str>,
        user_id: &UserId,
        update: &UserUpdateRequest,
    ) -> Result<User> {
        self.send_json(
            Method::PUT,
            self.endpoint(&["api", "users", user_id.as_str()]),
            bearer,
            update,
        )
        .await
    }

    pub async fn list_users(&self, bearer: Option<&str>) -> Result<Vec<User>> {
        self.get_json(self.endpoint(&["api", "users"]), bearer)
            .await
    }

    pub async fn delete_user(&self, bearer: Option<&str>, user_id: &UserId) -> Result<()> {
        self.delete(self.endpoint(&["api", "users", user_id.as_str()]), bearer)
            .await
    }

    /// Admin-only: creates an ADMIN or ORGANIZER account without logging
    /// into it.
    pub async fn create_account(
        &self,
        bearer: Option<&str>,
        request: &RegisterRequest,
    ) -> Result<User> {
        self.send_json(
            Method::POST,
            self.endpoint(&["api", "admin", "create-account"]),
            bearer,
            request,
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/users_tests.rs"]
mod tests;
