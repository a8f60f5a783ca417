//! Listing filters and pagination.

use std::str::FromStr;

use docseal_core::{Document, TeamId, UserId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Which documents a listing includes by hidden flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    All,
}

impl Visibility {
    pub fn admits(&self, is_hidden: bool) -> bool {
        match self {
            Self::Visible => !is_hidden,
            Self::Hidden => is_hidden,
            Self::All => true,
        }
    }

    /// `is_hidden` value a row must have, or `None` for no constraint.
    pub fn hidden_filter(&self) -> Option<bool> {
        match self {
            Self::Visible => Some(false),
            Self::Hidden => Some(true),
            Self::All => None,
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "visible" => Ok(Self::Visible),
            "hidden" => Ok(Self::Hidden),
            "all" => Ok(Self::All),
            other => Err(format!("unknown visibility {other:?}")),
        }
    }
}

/// Ownership constraint for listings and visibility changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerScope {
    #[default]
    Any,
    User(UserId),
    Team(TeamId),
}

impl OwnerScope {
    pub fn admits(&self, doc: &Document) -> bool {
        match self {
            Self::Any => true,
            Self::User(user) => doc.signed_by_user == *user,
            Self::Team(team) => doc.signed_by_team == Some(*team),
        }
    }
}

/// One page of a filtered listing. Newest documents come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentQuery {
    pub visibility: Visibility,
    pub scope: OwnerScope,
    page: u32,
    limit: u32,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            visibility: Visibility::Visible,
            scope: OwnerScope::Any,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DocumentQuery {
    pub fn new(visibility: Visibility, scope: OwnerScope) -> Self {
        Self {
            visibility,
            scope,
            ..Self::default()
        }
    }

    /// Set the 1-based page and page size. Page 0 becomes 1, a limit of 0
    /// becomes the default and anything above the maximum is capped.
    pub fn paged(mut self, page: Option<u32>, limit: Option<u32>) -> Self {
        self.page = page.unwrap_or(1).max(1);
        self.limit = match limit {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(n) => n.min(MAX_PAGE_SIZE),
        };
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn admits(&self, doc: &Document) -> bool {
        self.visibility.admits(doc.is_hidden) && self.scope.admits(doc)
    }
}

/// A page of results together with the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}
