//! The home feed endpoint has answered with several body shapes over time.
//! They are all resolved here, once.

use aura_common::model::post::Post;
use serde_json::Value;

const WRAPPER_FIELDS: [&str; 3] = ["posts", "data", "items"];

#[derive(Debug)]
pub enum FeedResponse {
    Bare(Vec<Post>),
    Posts(Vec<Post>),
    Data(Vec<Post>),
    Items(Vec<Post>),
    /// An object carrying none of the known wrapper fields.
    NoPosts,
    /// A known wrapper whose content is not a list, or a non-object body.
    Unrecognized(Value),
    /// A list whose entries are not posts.
    Malformed(serde_json::Error),
}

impl FeedResponse {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(_) => parse_posts(value, FeedResponse::Bare),
            Value::Object(mut object) => {
                for field in WRAPPER_FIELDS {
                    let inner = match object.remove(field) {
                        Some(inner) if !is_empty_marker(&inner) => inner,
                        _ => continue,
                    };

                    if !inner.is_array() {
                        return FeedResponse::Unrecognized(inner);
                    }

                    return match field {
                        "posts" => parse_posts(inner, FeedResponse::Posts),
                        "data" => parse_posts(inner, FeedResponse::Data),
                        _ => parse_posts(inner, FeedResponse::Items),
                    };
                }
                FeedResponse::NoPosts
            }
            other => FeedResponse::Unrecognized(other),
        }
    }

    /// `None` when the body could not be turned into a list of posts.
    #[must_use]
    pub fn into_posts(self) -> Option<Vec<Post>> {
        match self {
            FeedResponse::Bare(posts)
            | FeedResponse::Posts(posts)
            | FeedResponse::Data(posts)
            | FeedResponse::Items(posts) => Some(posts.into_iter().map(Post::normalized).collect()),
            FeedResponse::NoPosts => Some(Vec::new()),
            FeedResponse::Unrecognized(_) | FeedResponse::Malformed(_) => None,
        }
    }
}

/// Values the backend uses for "nothing here": `null`, `false`, `0` and `""`.
/// An empty list is still a list.
fn is_empty_marker(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn parse_posts(value: Value, wrap: fn(Vec<Post>) -> FeedResponse) -> FeedResponse {
    serde_json::from_value(value).map_or_else(FeedResponse::Malformed, wrap)
}
