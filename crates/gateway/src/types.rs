//! Request and response bodies of the Conduit API

use serde::{Deserialize, Deserializer, Serialize};

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// The authenticated user, as returned by login, register and `/user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub token: String,
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bio: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponseWrapper {
    pub user: UserResponse,
}

/// Public view of another user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bio: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image: String,
    #[serde(default)]
    pub following: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResponseWrapper {
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(default)]
    pub tag_list: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub favorited: bool,
    #[serde(default)]
    pub favorites_count: u64,
    pub author: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesResponse {
    pub articles: Vec<Article>,
    pub articles_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleResponseWrapper {
    pub article: Article,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
    pub author: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentResponseWrapper {
    pub comment: Comment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub user: LoginCredentials,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: LoginCredentials {
                email: email.into(),
                password: password.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub user: NewUser,
}

impl RegisterRequest {
    pub fn new(email: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: NewUser {
                email: email.into(),
                username: username.into(),
                password: password.into(),
            },
        }
    }
}

/// Fields of the current user to change; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUserRequest {
    pub user: UserChanges,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateArticleRequest {
    pub article: NewArticle,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateArticleRequest {
    pub article: ArticleChanges,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentRequest {
    pub comment: NewComment,
}

impl CreateCommentRequest {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            comment: NewComment { body: body.into() },
        }
    }
}

/// Filters for the global article list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub favorited: Option<String>,
}

impl ArticleParams {
    /// Query pairs in a stable order. Zero and empty values are left out.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_number(&mut pairs, "limit", self.limit);
        push_number(&mut pairs, "offset", self.offset);
        push_text(&mut pairs, "tag", self.tag.as_deref());
        push_text(&mut pairs, "author", self.author.as_deref());
        push_text(&mut pairs, "favorited", self.favorited.as_deref());
        pairs
    }
}

/// Paging for the followed-authors feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl FeedParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_number(&mut pairs, "limit", self.limit);
        push_number(&mut pairs, "offset", self.offset);
        pairs
    }
}

fn push_number(pairs: &mut Vec<(String, String)>, key: &str, value: Option<u32>) {
    if let Some(value) = value.filter(|v| *v != 0) {
        pairs.push((key.to_string(), value.to_string()));
    }
}

fn push_text(pairs: &mut Vec<(String, String)>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        pairs.push((key.to_string(), value.to_string()));
    }
}
