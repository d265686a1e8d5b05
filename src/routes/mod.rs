/// Router Module Index
///
/// Routes are split by who may reach them. Fine-grained checks (post ownership,
/// administrator role) happen in the handlers through the policy and the
/// `AdminUser` extractor.

/// Routes reachable without credentials.
pub mod public;

/// Backend routes under `/admin`, all behind authentication.
pub mod admin;
