//! Authentication: JWT issuance, validation and request extractors

mod extractor;
mod jwt;

pub use extractor::AdminUser;
pub use jwt::{AuthUser, Claims, JwtConfig, JwtError, JwtService};
