mod handlers;
mod router;
mod types;

pub use router::create_router;
pub use types::{BootstrapRequest, BootstrapResponse, ErrorResponse};

use std::sync::Arc;

use super::BootstrapService;

pub struct ApiState {
    pub service: Arc<BootstrapService>,
}

impl ApiState {
    pub fn new(service: Arc<BootstrapService>) -> Self {
        Self { service }
    }
}
