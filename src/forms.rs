//! Input validation for the sign-in, sign-up, article and comment forms
//!
//! Each form checks its fields in declaration order and reports the first
//! violation as [`Error::Validation`]. A form only turns into a request body
//! once it validates.

use crate::error::{Error, Result};
use conduit_gateway::types::{
    CreateArticleRequest, CreateCommentRequest, LoginRequest, NewArticle, RegisterRequest,
};
use regex::Regex;
use std::sync::OnceLock;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$";

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_TAGS: usize = 10;

fn email_pattern() -> Result<&'static Regex> {
    static EMAIL_RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(EMAIL_PATTERN))
        .as_ref()
        .map_err(Error::config)
}

fn check_email(email: &str) -> Result<()> {
    if email_pattern()?.is_match(email) {
        Ok(())
    } else {
        Err(Error::validation("email", "Invalid email address"))
    }
}

fn check_min(field: &'static str, value: &str, min: usize, message: &str) -> Result<()> {
    if value.chars().count() < min {
        return Err(Error::validation(field, message));
    }
    Ok(())
}

fn check_max(field: &'static str, value: &str, max: usize, message: &str) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::validation(field, message));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_email(&self.email)?;
        check_min("password", &self.password, MIN_PASSWORD_LEN, "Password must be at least 8 characters")
    }

    pub fn into_request(self) -> Result<LoginRequest> {
        self.validate()?;
        Ok(LoginRequest::new(self.email, self.password))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl RegisterForm {
    pub fn new(email: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_email(&self.email)?;
        check_min("username", &self.username, MIN_USERNAME_LEN, "Username must be at least 3 characters")?;
        check_min("password", &self.password, MIN_PASSWORD_LEN, "Password must be at least 8 characters")
    }

    pub fn into_request(self) -> Result<RegisterRequest> {
        self.validate()?;
        Ok(RegisterRequest::new(self.email, self.username, self.password))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleForm {
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
}

impl ArticleForm {
    pub fn validate(&self) -> Result<()> {
        check_min("title", &self.title, 1, "Title is required")?;
        check_max("title", &self.title, MAX_TITLE_LEN, "Title must be less than 255 characters")?;
        check_min("description", &self.description, 1, "Description is required")?;
        check_max(
            "description",
            &self.description,
            MAX_DESCRIPTION_LEN,
            "Description must be less than 500 characters",
        )?;
        check_min("body", &self.body, 1, "Body is required")?;
        if self.tag_list.len() > MAX_TAGS {
            return Err(Error::validation("tagList", "Maximum 10 tags allowed"));
        }
        Ok(())
    }

    pub fn into_request(self) -> Result<CreateArticleRequest> {
        self.validate()?;
        Ok(CreateArticleRequest {
            article: NewArticle {
                title: self.title,
                description: self.description,
                body: self.body,
                tag_list: self.tag_list,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentForm {
    pub body: String,
}

impl CommentForm {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn validate(&self) -> Result<()> {
        check_min("body", self.body.trim(), 1, "Comment is required")
    }

    pub fn into_request(self) -> Result<CreateCommentRequest> {
        self.validate()?;
        Ok(CreateCommentRequest::new(self.body))
    }
}
