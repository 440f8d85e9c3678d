use crate::model::{post::Post, user::User};
use serde::{Deserialize, Serialize};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Profile {
    pub user: User,
    #[serde(default)]
    pub incidents: Vec<Post>,
}

/// Body of `PUT /profile`. Empty strings clear a field.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub username: String,
    pub bio: String,
    pub location: String,
    pub website: String,
}

impl From<&User> for ProfileUpdate {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            username: user.username.clone().unwrap_or_default(),
            bio: user.bio.clone().unwrap_or_default(),
            location: user.location.clone().unwrap_or_default(),
            website: user.website.clone().unwrap_or_default(),
        }
    }
}
