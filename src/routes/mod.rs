/// Router Module Index
///
/// Routing is split by access level so the authentication layer is applied
/// per module rather than per handler.

/// Routes accessible without a token: health, registration and login.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated bearer token (or the local `x-user-id` bypass).
pub mod authenticated;
