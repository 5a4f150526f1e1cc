//! Service layer translating gateway calls into session transitions and
//! broadcast fan-out.

pub mod documentation;
pub mod session_service;
pub mod websocket_service;
