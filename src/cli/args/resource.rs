//! Gated resource arguments for access commands

use clap::Args;

use crate::access::GatedResource;
use crate::error::Result;

/// Identifies a tag or product that gates content
#[derive(Args, Debug, Clone)]
pub struct GatedResourceArgs {
    /// Resource type (tag, product)
    #[arg(long = "resource-type", short = 't')]
    pub resource_type: String,

    /// Kit ID of the tag or product
    #[arg(long = "resource-id", short = 'i')]
    pub resource_id: String,
}

impl GatedResourceArgs {
    pub fn parse(&self) -> Result<GatedResource> {
        Ok(GatedResource::parse(&self.resource_type, &self.resource_id)?)
    }
}
