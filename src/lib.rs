//! Participant-facing gateway to the tournament-management API.
//!
//! Browser requests arrive at the routes in [`handlers`]; each one turns into
//! one or more calls through [`gateway::ApiGateway`], which attaches the
//! bearer token from the request's cookies.

pub mod config;
pub mod cookies;
pub mod desktop;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod session;
pub mod state;
pub mod telemetry;

pub use config::AppConfig;
pub use error::{AppError, GatewayError};
pub use gateway::{ApiGateway, ApiResponse, CredentialPolicy, GatewayConfig, RequestOptions};
pub use handlers::router;
pub use state::AppState;
