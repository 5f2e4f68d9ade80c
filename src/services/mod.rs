//! Service layer: room operations, socket lifecycle, and health reporting.

/// Health endpoint backing logic.
pub mod health_service;
/// Room lifecycle, drawing relay, and vote operations.
pub mod room_service;
/// WebSocket connection handling and dispatch.
pub mod websocket_service;
