pub mod cookies;
pub mod csrf;
pub mod external;
pub mod extractors;
pub mod google;
pub mod jwt;
pub mod password;
pub mod services;
pub mod tokens;
