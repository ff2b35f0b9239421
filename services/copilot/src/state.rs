//! Application state shared across handlers

use common::jwt::JwtService;

use crate::service::CopilotService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub copilot_service: CopilotService,
    pub jwt_service: JwtService,
}
