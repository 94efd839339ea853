/// Backend API module
///
/// Request assembly and validation (request.rs) and the HTTP client for the
/// collaborator /edit-image endpoint (client.rs).

pub mod client;
pub mod request;
