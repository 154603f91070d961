//! Integration tests for the participant gateway.
//!
//! The gateway tests drive `ApiGateway` directly against a mock API. The
//! route tests start the full router on an ephemeral port and talk to it with
//! `reqwest`, the way a browser would.

pub mod gateway_test;
pub mod participant_test;
pub mod session_test;
