//! DTOs for the user endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::{MAX_ID_LEN_U64, MAX_NAME_LEN_U64, NewUser, User, UserPatch};

/// Request body for `POST /users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = MAX_ID_LEN_U64, message = "id length is out of range"))]
    pub id: String,

    #[validate(length(min = 1, max = MAX_NAME_LEN_U64, message = "name length is out of range"))]
    pub name: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        NewUser::new(req.id, req.name)
    }
}

/// Request body for `PUT /users/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = MAX_NAME_LEN_U64, message = "name length is out of range"))]
    pub name: String,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        UserPatch::new(req.name)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub message: &'static str,
}
