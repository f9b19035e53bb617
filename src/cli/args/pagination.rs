//! Pagination and ordering arguments for resource lists

use clap::Args;

use super::SortDir;
use crate::resource::CacheOptions;

/// Paging over a cached resource list.
///
/// Ordering flags override the configured `order_by` / `order` for one call.
#[derive(Args, Debug, Clone)]
pub struct PaginationArgs {
    /// Page number (1-indexed, clamped into range)
    #[arg(long, short = 'p', default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,

    /// Items per page (0 or less lists everything)
    #[arg(long, short = 'n', default_value_t = 0, allow_negative_numbers = true)]
    pub per_page: i64,

    /// Field to order by
    #[arg(long)]
    pub order_by: Option<String>,

    /// Order direction (asc, desc)
    #[arg(long, value_enum, hide_possible_values = true)]
    pub order: Option<SortDir>,
}

impl Default for PaginationArgs {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 0,
            order_by: None,
            order: None,
        }
    }
}

impl PaginationArgs {
    /// Apply ordering overrides on top of the configured cache options
    pub fn apply(&self, mut options: CacheOptions) -> CacheOptions {
        if let Some(ref field) = self.order_by {
            options.order_by = field.clone();
        }
        if let Some(dir) = self.order {
            options.order = dir.into();
        }
        options
    }
}
