//! Resource display model

use serde::Serialize;
use tabled::Tabled;

use crate::client::models::{CustomField, Form, LandingPage, Post, Product, Sequence, Tag};
use crate::output::formatters::{format_datetime, truncate};

/// One cached record, reduced to the columns every resource type shares.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ResourceDisplay {
    #[tabled(rename = "ID")]
    pub id: u64,

    #[tabled(rename = "NAME")]
    pub name: String,

    /// Type-specific summary
    #[tabled(rename = "DETAILS")]
    pub details: String,
}

const NAME_WIDTH: usize = 48;

fn flags(pairs: &[(bool, &str)]) -> String {
    let set: Vec<&str> = pairs
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, label)| *label)
        .collect();
    set.join(", ")
}

impl From<&Form> for ResourceDisplay {
    fn from(form: &Form) -> Self {
        let format = form.format.clone().unwrap_or_else(|| "-".to_string());
        let details = if form.archived {
            format!("{} (archived)", format)
        } else {
            format
        };
        Self {
            id: form.id,
            name: truncate(&form.name, NAME_WIDTH),
            details,
        }
    }
}

impl From<&LandingPage> for ResourceDisplay {
    fn from(page: &LandingPage) -> Self {
        Self {
            id: page.id,
            name: truncate(&page.name, NAME_WIDTH),
            details: page.embed_url.clone().unwrap_or_default(),
        }
    }
}

impl From<&Tag> for ResourceDisplay {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            name: truncate(&tag.name, NAME_WIDTH),
            details: format!("created {}", format_datetime(tag.created_at)),
        }
    }
}

impl From<&Sequence> for ResourceDisplay {
    fn from(sequence: &Sequence) -> Self {
        Self {
            id: sequence.id,
            name: truncate(&sequence.name, NAME_WIDTH),
            details: flags(&[(sequence.hold, "on hold"), (sequence.repeat, "repeats")]),
        }
    }
}

impl From<&CustomField> for ResourceDisplay {
    fn from(field: &CustomField) -> Self {
        Self {
            id: field.id,
            name: truncate(&field.label, NAME_WIDTH),
            details: field.key.clone(),
        }
    }
}

impl From<&Post> for ResourceDisplay {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            name: truncate(&post.title, NAME_WIDTH),
            details: format!("published {}", format_datetime(post.published_at)),
        }
    }
}

impl From<&Product> for ResourceDisplay {
    fn from(product: &Product) -> Self {
        let status = if product.published {
            "published"
        } else {
            "draft"
        };
        let details = match product.url {
            Some(ref url) => format!("{} {}", status, url),
            None => status.to_string(),
        };
        Self {
            id: product.id,
            name: truncate(&product.name, NAME_WIDTH),
            details,
        }
    }
}
