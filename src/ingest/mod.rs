/// Input handling at the service boundary.
///
/// Submodules:
/// - `request`: JSON request/response shapes and structural validation.
/// - `csv_upload`: wide-format CSV uploads from field teams.

pub mod csv_upload;
pub mod request;
